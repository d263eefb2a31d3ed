//! Story entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

use crate::models::segment::Segment;

/// A row from the `stories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Story {
    pub id: DbId,
    pub base_idea: String,
    pub story_title: String,
    pub visual_style: String,
    pub script_tone: String,
    pub video_url: Option<String>,
    pub video_status: String,
    pub video_job_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new story row.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStory {
    pub base_idea: String,
    pub story_title: String,
    pub visual_style: String,
    pub script_tone: String,
}

/// One generated segment of a standalone story.
///
/// The index is positional: the n-th entry is stored with `segment_index = n`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStorySegment {
    pub text: String,
    pub visual_prompt: String,
    pub duration_seconds: i32,
}

/// A story with its segments in render order.
#[derive(Debug, Clone, Serialize)]
pub struct StoryWithSegments {
    #[serde(flatten)]
    pub story: Story,
    pub segments: Vec<Segment>,
}
