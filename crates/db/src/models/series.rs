//! Series entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

use crate::models::episode::Episode;

/// A row from the `series` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Series {
    pub id: DbId,
    pub title: String,
    pub tagline: Option<String>,
    pub base_concept: String,
    pub full_lore: String,
    pub genre: Vec<String>,
    pub themes: Vec<String>,
    pub setting: Option<String>,
    pub planned_seasons: i32,
    pub current_season: i32,
    pub episodes_per_season: i32,
    pub narrative_style: String,
    pub target_duration_per_episode: i32,
    pub visual_style: String,
    pub script_style: String,
    /// Character sheets as generated with the lore, before migration into
    /// the `characters` table.
    pub main_characters: serde_json::Value,
    pub series_poster_url: Option<String>,
    pub series_poster_status: String,
    pub series_poster_prompt: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new series.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeries {
    pub title: String,
    pub tagline: Option<String>,
    pub base_concept: String,
    pub full_lore: String,
    pub genre: Vec<String>,
    pub themes: Vec<String>,
    pub setting: Option<String>,
    pub planned_seasons: i32,
    pub episodes_per_season: i32,
    pub narrative_style: String,
    pub target_duration_per_episode: i32,
    pub visual_style: String,
    pub script_style: String,
    pub main_characters: serde_json::Value,
}

/// DTO for updating an existing series. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSeries {
    pub title: Option<String>,
    pub tagline: Option<String>,
    pub setting: Option<String>,
    pub current_season: Option<i32>,
    pub planned_seasons: Option<i32>,
    pub visual_style: Option<String>,
    pub script_style: Option<String>,
    pub status: Option<String>,
}

/// Status and runtime of one episode, as read by series analytics.
#[derive(Debug, Clone, FromRow)]
pub struct EpisodeStatusRow {
    pub status: String,
    pub actual_duration: Option<i32>,
}

/// A series with all of its episodes, ordered by season and number.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesWithEpisodes {
    #[serde(flatten)]
    pub series: Series,
    pub episodes: Vec<Episode>,
}
