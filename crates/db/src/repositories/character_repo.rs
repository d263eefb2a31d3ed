//! Repository for the `characters` table.

use sqlx::PgPool;
use studio_core::status::PosterStatus;
use studio_core::types::DbId;

use crate::models::character::{Character, CreateCharacter, UpdateCharacter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, series_id, name, role, description, character_arc, visual_prompt, \
     visual_keywords, age_range, distinctive_features, clothing_style, poster_url, \
     poster_status, poster_prompt, color_palette, importance_level, is_recurring, \
     created_at, updated_at";

/// Provides CRUD operations for series characters plus poster bookkeeping.
pub struct CharacterRepo;

impl CharacterRepo {
    /// Insert a new character, returning the created row.
    ///
    /// `visual_prompt` must already be resolved by the caller; an absent
    /// prompt is stored as the empty string.
    pub async fn create(pool: &PgPool, input: &CreateCharacter) -> Result<Character, sqlx::Error> {
        let query = format!(
            "INSERT INTO characters \
                (series_id, name, role, description, character_arc, visual_prompt, \
                 visual_keywords, age_range, distinctive_features, clothing_style, \
                 color_palette, importance_level, is_recurring) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, ''), $7, $8, $9, $10, $11, \
                     COALESCE($12, 5), COALESCE($13, true)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(input.series_id)
            .bind(&input.name)
            .bind(&input.role)
            .bind(&input.description)
            .bind(&input.character_arc)
            .bind(&input.visual_prompt)
            .bind(&input.visual_keywords)
            .bind(&input.age_range)
            .bind(&input.distinctive_features)
            .bind(&input.clothing_style)
            .bind(&input.color_palette)
            .bind(input.importance_level)
            .bind(input.is_recurring)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Character>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE id = $1");
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Characters of a series, most important first.
    pub async fn list_for_series(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<Character>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM characters \
             WHERE series_id = $1 \
             ORDER BY importance_level DESC, name ASC"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(series_id)
            .fetch_all(pool)
            .await
    }

    /// Update a character. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCharacter,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!(
            "UPDATE characters SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                description = COALESCE($4, description),
                character_arc = COALESCE($5, character_arc),
                visual_prompt = COALESCE($6, visual_prompt),
                importance_level = COALESCE($7, importance_level),
                is_recurring = COALESCE($8, is_recurring)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.role)
            .bind(&input.description)
            .bind(&input.character_arc)
            .bind(&input.visual_prompt)
            .bind(input.importance_level)
            .bind(input.is_recurring)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of a poster generation.
    pub async fn set_poster(
        pool: &PgPool,
        id: DbId,
        url: Option<&str>,
        status: PosterStatus,
        prompt: Option<&str>,
    ) -> Result<Option<Character>, sqlx::Error> {
        let query = format!(
            "UPDATE characters SET \
                poster_url = COALESCE($2, poster_url), \
                poster_status = $3, \
                poster_prompt = COALESCE($4, poster_prompt) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .bind(url)
            .bind(status.as_str())
            .bind(prompt)
            .fetch_optional(pool)
            .await
    }
}
