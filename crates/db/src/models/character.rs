//! Character entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

/// A row from the `characters` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Character {
    pub id: DbId,
    pub series_id: DbId,
    pub name: String,
    pub role: String,
    pub description: String,
    pub character_arc: Option<String>,
    pub visual_prompt: String,
    pub visual_keywords: Vec<String>,
    pub age_range: Option<String>,
    pub distinctive_features: Vec<String>,
    pub clothing_style: Option<String>,
    pub poster_url: Option<String>,
    pub poster_status: String,
    pub poster_prompt: Option<String>,
    pub color_palette: Vec<String>,
    pub importance_level: i32,
    pub is_recurring: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new character.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacter {
    pub series_id: DbId,
    pub name: String,
    pub role: String,
    pub description: String,
    pub character_arc: Option<String>,
    /// Filled with a role-based default by the character service when empty.
    pub visual_prompt: Option<String>,
    #[serde(default)]
    pub visual_keywords: Vec<String>,
    pub age_range: Option<String>,
    #[serde(default)]
    pub distinctive_features: Vec<String>,
    pub clothing_style: Option<String>,
    #[serde(default)]
    pub color_palette: Vec<String>,
    pub importance_level: Option<i32>,
    pub is_recurring: Option<bool>,
}

/// DTO for updating an existing character. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCharacter {
    pub name: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub character_arc: Option<String>,
    pub visual_prompt: Option<String>,
    pub importance_level: Option<i32>,
    pub is_recurring: Option<bool>,
}
