//! Generation activity rows backing the dashboard feed.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::types::{DbId, Timestamp};

/// A row from the `generations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Generation {
    pub id: DbId,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub provider: String,
    pub story_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGeneration {
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: String,
    pub story_id: Option<DbId>,
    pub metadata: Option<serde_json::Value>,
}
