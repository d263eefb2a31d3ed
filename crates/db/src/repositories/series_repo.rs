//! Repository for the `series` table.

use sqlx::PgPool;
use studio_core::status::PosterStatus;
use studio_core::types::DbId;

use crate::models::series::{CreateSeries, EpisodeStatusRow, Series, UpdateSeries};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, title, tagline, base_concept, full_lore, genre, themes, setting, \
     planned_seasons, current_season, episodes_per_season, narrative_style, \
     target_duration_per_episode, visual_style, script_style, main_characters, \
     series_poster_url, series_poster_status, series_poster_prompt, status, \
     created_at, updated_at";

/// Provides CRUD operations for series.
pub struct SeriesRepo;

impl SeriesRepo {
    /// Insert a new series in `draft` status, starting at season 1.
    pub async fn create(pool: &PgPool, input: &CreateSeries) -> Result<Series, sqlx::Error> {
        let query = format!(
            "INSERT INTO series \
                (title, tagline, base_concept, full_lore, genre, themes, setting, \
                 planned_seasons, current_season, episodes_per_season, narrative_style, \
                 target_duration_per_episode, visual_style, script_style, main_characters, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9, $10, $11, $12, $13, $14, 'draft') \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Series>(&query)
            .bind(&input.title)
            .bind(&input.tagline)
            .bind(&input.base_concept)
            .bind(&input.full_lore)
            .bind(&input.genre)
            .bind(&input.themes)
            .bind(&input.setting)
            .bind(input.planned_seasons)
            .bind(input.episodes_per_season)
            .bind(&input.narrative_style)
            .bind(input.target_duration_per_episode)
            .bind(&input.visual_style)
            .bind(&input.script_style)
            .bind(&input.main_characters)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Series>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM series WHERE id = $1");
        sqlx::query_as::<_, Series>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all series, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Series>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM series ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Series>(&query).fetch_all(pool).await
    }

    /// Update a series. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSeries,
    ) -> Result<Option<Series>, sqlx::Error> {
        let query = format!(
            "UPDATE series SET
                title = COALESCE($2, title),
                tagline = COALESCE($3, tagline),
                setting = COALESCE($4, setting),
                current_season = COALESCE($5, current_season),
                planned_seasons = COALESCE($6, planned_seasons),
                visual_style = COALESCE($7, visual_style),
                script_style = COALESCE($8, script_style),
                status = COALESCE($9, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Series>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.tagline)
            .bind(&input.setting)
            .bind(input.current_season)
            .bind(input.planned_seasons)
            .bind(&input.visual_style)
            .bind(&input.script_style)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Delete a series; episodes and characters cascade.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM series WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of a series poster generation.
    pub async fn set_poster(
        pool: &PgPool,
        id: DbId,
        url: Option<&str>,
        status: PosterStatus,
        prompt: Option<&str>,
    ) -> Result<Option<Series>, sqlx::Error> {
        let query = format!(
            "UPDATE series SET \
                series_poster_url = COALESCE($2, series_poster_url), \
                series_poster_status = $3, \
                series_poster_prompt = COALESCE($4, series_poster_prompt) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Series>(&query)
            .bind(id)
            .bind(url)
            .bind(status.as_str())
            .bind(prompt)
            .fetch_optional(pool)
            .await
    }

    /// Status and runtime of every episode of the series.
    pub async fn list_episode_statuses(
        pool: &PgPool,
        series_id: DbId,
    ) -> Result<Vec<EpisodeStatusRow>, sqlx::Error> {
        sqlx::query_as::<_, EpisodeStatusRow>(
            "SELECT status, actual_duration FROM episodes WHERE series_id = $1",
        )
        .bind(series_id)
        .fetch_all(pool)
        .await
    }
}
