//! Repository for the append-only `token_usage` table.

use sqlx::PgPool;
use studio_core::types::DbId;

use crate::models::token_usage::{CreateTokenUsage, TokenUsage};

const COLUMNS: &str = "id, generation_type, model_used, provider, prompt_tokens, \
     completion_tokens, total_tokens, context_type, series_id, episode_id, segment_id, \
     story_id, character_id, generation_id, estimated_cost_usd, metadata, created_at";

/// Inserts and filtered reads. Rows are never updated or deleted.
pub struct TokenUsageRepo;

impl TokenUsageRepo {
    pub async fn insert(pool: &PgPool, input: &CreateTokenUsage) -> Result<TokenUsage, sqlx::Error> {
        let query = format!(
            "INSERT INTO token_usage \
                (generation_type, model_used, provider, prompt_tokens, completion_tokens, \
                 total_tokens, context_type, series_id, episode_id, segment_id, story_id, \
                 character_id, generation_id, estimated_cost_usd, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                     COALESCE($15, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TokenUsage>(&query)
            .bind(&input.generation_type)
            .bind(&input.model_used)
            .bind(&input.provider)
            .bind(input.prompt_tokens)
            .bind(input.completion_tokens)
            .bind(input.total_tokens)
            .bind(&input.context_type)
            .bind(input.series_id)
            .bind(input.episode_id)
            .bind(input.segment_id)
            .bind(input.story_id)
            .bind(input.character_id)
            .bind(input.generation_id)
            .bind(input.estimated_cost_usd)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    async fn list_where(
        pool: &PgPool,
        column: &'static str,
        id: DbId,
    ) -> Result<Vec<TokenUsage>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM token_usage WHERE {column} = $1 ORDER BY id ASC");
        sqlx::query_as::<_, TokenUsage>(&query)
            .bind(id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_segment(pool: &PgPool, id: DbId) -> Result<Vec<TokenUsage>, sqlx::Error> {
        Self::list_where(pool, "segment_id", id).await
    }

    pub async fn list_by_episode(pool: &PgPool, id: DbId) -> Result<Vec<TokenUsage>, sqlx::Error> {
        Self::list_where(pool, "episode_id", id).await
    }

    pub async fn list_by_story(pool: &PgPool, id: DbId) -> Result<Vec<TokenUsage>, sqlx::Error> {
        Self::list_where(pool, "story_id", id).await
    }

    pub async fn list_by_character(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Vec<TokenUsage>, sqlx::Error> {
        Self::list_where(pool, "character_id", id).await
    }

    /// Rows linked directly to the series.
    pub async fn list_by_series(pool: &PgPool, id: DbId) -> Result<Vec<TokenUsage>, sqlx::Error> {
        Self::list_where(pool, "series_id", id).await
    }

    /// Series rows not attributed to any episode (lore, posters, batches).
    pub async fn list_series_level(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<TokenUsage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM token_usage \
             WHERE series_id = $1 AND episode_id IS NULL ORDER BY id ASC"
        );
        sqlx::query_as::<_, TokenUsage>(&query)
            .bind(series_id)
            .fetch_all(pool)
            .await
    }

    /// Rows linked to any of `episode_ids`.
    pub async fn list_by_episodes(
        pool: &PgPool,
        episode_ids: &[DbId],
    ) -> Result<Vec<TokenUsage>, sqlx::Error> {
        if episode_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {COLUMNS} FROM token_usage WHERE episode_id = ANY($1) ORDER BY id ASC"
        );
        sqlx::query_as::<_, TokenUsage>(&query)
            .bind(episode_ids)
            .fetch_all(pool)
            .await
    }
}
