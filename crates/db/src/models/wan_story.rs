//! Wan story and segment models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

/// A row from the `wan_stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WanStory {
    pub id: DbId,
    pub title: String,
    pub premise: String,
    pub visual_style: String,
    pub status: String,
    pub created_at: Timestamp,
}

/// A row from the `wan_story_segments` table. `segment_index` is 1-based.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WanStorySegment {
    pub id: DbId,
    pub story_id: DbId,
    pub segment_index: i32,
    pub text_content: String,
    pub visual_prompt: String,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub status: String,
    pub dashscope_task_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWanStory {
    pub title: String,
    pub premise: String,
    pub visual_style: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewWanSegment {
    pub text_content: String,
    pub visual_prompt: String,
}

/// A Wan story with its segments ordered by index.
#[derive(Debug, Clone, Serialize)]
pub struct WanStoryWithSegments {
    #[serde(flatten)]
    pub story: WanStory,
    pub segments: Vec<WanStorySegment>,
}
