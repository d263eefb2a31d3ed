//! History rows for character and series poster generations.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

/// A row from the `character_visual_generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CharacterVisualGeneration {
    pub id: DbId,
    pub character_id: DbId,
    pub prompt: String,
    pub visual_style: String,
    pub generation_type: String,
    pub image_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub is_selected: bool,
    pub model_used: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacterVisualGeneration {
    pub character_id: DbId,
    pub prompt: String,
    pub visual_style: String,
    pub generation_type: String,
    pub image_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub is_selected: bool,
    pub model_used: Option<String>,
}

/// A row from the `series_poster_generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SeriesPosterGeneration {
    pub id: DbId,
    pub series_id: DbId,
    pub prompt: String,
    pub visual_style: String,
    pub image_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub is_selected: bool,
    pub model_used: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSeriesPosterGeneration {
    pub series_id: DbId,
    pub prompt: String,
    pub visual_style: String,
    pub image_url: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub is_selected: bool,
    pub model_used: Option<String>,
}
