//! Episode entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

use crate::models::segment::Segment;

/// A row from the `episodes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Episode {
    pub id: DbId,
    pub series_id: DbId,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
    pub synopsis: String,
    pub story_beats: Vec<String>,
    /// `[{ "name": ..., "focus": ... }]` as generated.
    pub featured_characters: serde_json::Value,
    pub status: String,
    pub target_duration: i32,
    pub actual_duration: Option<i32>,
    // -- Continuity --
    pub previous_episode_recap: Option<String>,
    pub cliffhanger: Option<String>,
    pub next_episode_tease: Option<String>,
    // -- Render --
    pub video_url: Option<String>,
    pub video_status: Option<String>,
    pub video_job_id: Option<String>,
    pub is_premiere: bool,
    pub is_finale: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an episode.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEpisode {
    pub series_id: DbId,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: String,
    pub synopsis: String,
    pub story_beats: Vec<String>,
    pub featured_characters: serde_json::Value,
    pub target_duration: i32,
    pub cliffhanger: Option<String>,
    pub is_premiere: bool,
    pub is_finale: bool,
}

/// DTO for updating an existing episode. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEpisode {
    pub title: Option<String>,
    pub synopsis: Option<String>,
    pub story_beats: Option<Vec<String>>,
    pub status: Option<String>,
    pub target_duration: Option<i32>,
    pub actual_duration: Option<i32>,
}

/// Continuity text written onto an episode from its predecessor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EpisodeContinuity {
    pub previous_episode_recap: String,
    pub cliffhanger: Option<String>,
    pub next_episode_tease: Option<String>,
}

/// An episode with its segments in render order.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeWithSegments {
    #[serde(flatten)]
    pub episode: Episode,
    pub segments: Vec<Segment>,
}
