//! Segment entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

/// A row from the `segments` table.
///
/// At least one of `story_id` / `episode_id` is set. Episode segments carry
/// both: the backing story row is what the renderer and asset buckets key on.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Segment {
    pub id: DbId,
    pub story_id: Option<DbId>,
    pub episode_id: Option<DbId>,
    pub segment_index: i32,
    pub segment_type: String,
    pub character_focus: Option<String>,
    pub text: String,
    pub visual_prompt: String,
    pub duration_seconds: i32,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    // -- Wan clip --
    pub video_url: Option<String>,
    pub video_status: String,
    pub video_asset_id: Option<String>,
    pub created_at: Timestamp,
}

impl Segment {
    /// Storage owner: the story when present, otherwise the episode.
    pub fn owner_id(&self) -> DbId {
        self.story_id.or(self.episode_id).unwrap_or(self.id)
    }
}

/// DTO for a segment produced by the episode segment generator.
///
/// `segment_index` is taken verbatim from the model's answer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEpisodeSegment {
    pub segment_index: i32,
    pub segment_type: String,
    pub character_focus: Option<String>,
    pub text: String,
    pub visual_prompt: String,
    pub duration_seconds: i32,
}
