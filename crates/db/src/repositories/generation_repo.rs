//! Repository for the `generations` activity table.

use sqlx::PgPool;
use studio_core::types::{DbId, Timestamp};

use crate::models::generation::{CreateGeneration, Generation};

const COLUMNS: &str = "id, type, status, provider, story_id, metadata, start_time, end_time, \
     duration_ms, created_at";

pub struct GenerationRepo;

impl GenerationRepo {
    /// Open a `pending` row with `start_time = NOW()`.
    pub async fn create(pool: &PgPool, input: &CreateGeneration) -> Result<Generation, sqlx::Error> {
        let query = format!(
            "INSERT INTO generations (type, status, provider, story_id, metadata) \
             VALUES ($1, 'pending', $2, $3, COALESCE($4, '{{}}'::jsonb)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(&input.kind)
            .bind(&input.provider)
            .bind(input.story_id)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Close a row as `completed`, linking the produced story and merging
    /// `metadata` into the existing object.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        story_id: Option<DbId>,
        end_time: Timestamp,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations SET \
                status = 'completed', \
                story_id = COALESCE($2, story_id), \
                end_time = $3, \
                duration_ms = (EXTRACT(EPOCH FROM ($3 - start_time)) * 1000)::BIGINT, \
                metadata = metadata || COALESCE($4, '{{}}'::jsonb) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(story_id)
            .bind(end_time)
            .bind(metadata)
            .fetch_optional(pool)
            .await
    }

    /// Close a row as `failed`, recording the error message in metadata.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        end_time: Timestamp,
        error: &str,
    ) -> Result<Option<Generation>, sqlx::Error> {
        let query = format!(
            "UPDATE generations SET \
                status = 'failed', \
                end_time = $2, \
                duration_ms = (EXTRACT(EPOCH FROM ($2 - start_time)) * 1000)::BIGINT, \
                metadata = metadata || jsonb_build_object('error', $3::TEXT) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Generation>(&query)
            .bind(id)
            .bind(end_time)
            .bind(error)
            .fetch_optional(pool)
            .await
    }

    /// Most recent rows first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Generation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generations ORDER BY created_at DESC LIMIT $1");
        sqlx::query_as::<_, Generation>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
