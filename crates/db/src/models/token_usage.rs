//! Token usage fact model.
//!
//! There is no update DTO: rows are append-only.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::error::CoreError;
use studio_core::status::GenerationType;
use studio_core::types::{DbId, Timestamp};
use studio_core::usage::UsageFact;

/// A row from the `token_usage` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TokenUsage {
    pub id: DbId,
    pub generation_type: String,
    pub model_used: String,
    pub provider: String,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub total_tokens: i32,
    pub context_type: Option<String>,
    pub series_id: Option<DbId>,
    pub episode_id: Option<DbId>,
    pub segment_id: Option<DbId>,
    pub story_id: Option<DbId>,
    pub character_id: Option<DbId>,
    pub generation_id: Option<DbId>,
    pub estimated_cost_usd: Option<f64>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for appending a usage fact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTokenUsage {
    pub generation_type: String,
    pub model_used: String,
    pub provider: String,
    pub prompt_tokens: i32,
    pub completion_tokens: i32,
    pub total_tokens: i32,
    pub context_type: Option<String>,
    pub series_id: Option<DbId>,
    pub episode_id: Option<DbId>,
    pub segment_id: Option<DbId>,
    pub story_id: Option<DbId>,
    pub character_id: Option<DbId>,
    pub generation_id: Option<DbId>,
    pub estimated_cost_usd: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

impl TryFrom<&TokenUsage> for UsageFact {
    type Error = CoreError;

    fn try_from(row: &TokenUsage) -> Result<Self, Self::Error> {
        Ok(UsageFact {
            id: row.id,
            generation_type: GenerationType::from_str(&row.generation_type)?,
            model_used: row.model_used.clone(),
            prompt_tokens: i64::from(row.prompt_tokens),
            completion_tokens: i64::from(row.completion_tokens),
            total_tokens: i64::from(row.total_tokens),
            context_type: row.context_type.clone(),
            estimated_cost_usd: row.estimated_cost_usd,
        })
    }
}
