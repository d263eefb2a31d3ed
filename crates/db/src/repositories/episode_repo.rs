//! Repository for the `episodes` table.

use sqlx::PgPool;
use studio_core::status::{EpisodeStatus, VideoStatus};
use studio_core::types::DbId;

use crate::models::episode::{CreateEpisode, Episode, EpisodeContinuity, UpdateEpisode};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, series_id, season_number, episode_number, title, synopsis, \
     story_beats, featured_characters, status, target_duration, actual_duration, \
     previous_episode_recap, cliffhanger, next_episode_tease, video_url, video_status, \
     video_job_id, is_premiere, is_finale, created_at, updated_at";

/// Provides CRUD operations for episodes.
pub struct EpisodeRepo;

impl EpisodeRepo {
    /// Insert a batch of `draft` episodes in one transaction.
    ///
    /// Episodes whose `(series, season, number)` already exists are skipped
    /// and absent from the result.
    pub async fn create_many(
        pool: &PgPool,
        inputs: &[CreateEpisode],
    ) -> Result<Vec<Episode>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO episodes \
                (series_id, season_number, episode_number, title, synopsis, story_beats, \
                 featured_characters, status, target_duration, cliffhanger, is_premiere, is_finale) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', $8, $9, $10, $11) \
             ON CONFLICT ON CONSTRAINT uq_episodes_series_season_number DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let row = sqlx::query_as::<_, Episode>(&query)
                .bind(input.series_id)
                .bind(input.season_number)
                .bind(input.episode_number)
                .bind(&input.title)
                .bind(&input.synopsis)
                .bind(&input.story_beats)
                .bind(&input.featured_characters)
                .bind(input.target_duration)
                .bind(&input.cliffhanger)
                .bind(input.is_premiere)
                .bind(input.is_finale)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = row {
                created.push(row);
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM episodes WHERE id = $1");
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Episodes of a series ordered by season and number, optionally
    /// restricted to one season.
    pub async fn list_for_series(
        pool: &PgPool,
        series_id: DbId,
        season_number: Option<i32>,
    ) -> Result<Vec<Episode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM episodes \
             WHERE series_id = $1 AND ($2::INTEGER IS NULL OR season_number = $2) \
             ORDER BY season_number ASC, episode_number ASC"
        );
        sqlx::query_as::<_, Episode>(&query)
            .bind(series_id)
            .bind(season_number)
            .fetch_all(pool)
            .await
    }

    /// Episodes whose render was submitted but never settled.
    pub async fn list_generating_videos(pool: &PgPool) -> Result<Vec<Episode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM episodes \
             WHERE video_status = 'generating' AND video_job_id IS NOT NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, Episode>(&query).fetch_all(pool).await
    }

    /// Update an episode. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateEpisode,
    ) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!(
            "UPDATE episodes SET
                title = COALESCE($2, title),
                synopsis = COALESCE($3, synopsis),
                story_beats = COALESCE($4, story_beats),
                status = COALESCE($5, status),
                target_duration = COALESCE($6, target_duration),
                actual_duration = COALESCE($7, actual_duration)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.synopsis)
            .bind(&input.story_beats)
            .bind(&input.status)
            .bind(input.target_duration)
            .bind(input.actual_duration)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: EpisodeStatus,
    ) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!("UPDATE episodes SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM episodes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the render columns of an episode.
    pub async fn update_video(
        pool: &PgPool,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!(
            "UPDATE episodes SET video_url = $2, video_status = $3, video_job_id = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .bind(video_url)
            .bind(status.as_str())
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_continuity(
        pool: &PgPool,
        id: DbId,
        continuity: &EpisodeContinuity,
    ) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!(
            "UPDATE episodes SET \
                previous_episode_recap = $2, cliffhanger = $3, next_episode_tease = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Episode>(&query)
            .bind(id)
            .bind(&continuity.previous_episode_recap)
            .bind(&continuity.cliffhanger)
            .bind(&continuity.next_episode_tease)
            .fetch_optional(pool)
            .await
    }

    /// Episode numbers already used in a season.
    pub async fn list_numbers(
        pool: &PgPool,
        series_id: DbId,
        season_number: i32,
    ) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT episode_number FROM episodes \
             WHERE series_id = $1 AND season_number = $2 \
             ORDER BY episode_number",
        )
        .bind(series_id)
        .bind(season_number)
        .fetch_all(pool)
        .await
    }

    /// `max(episode_number) + 1` within the season, or 1 when empty.
    pub async fn next_episode_number(
        pool: &PgPool,
        series_id: DbId,
        season_number: i32,
    ) -> Result<i32, sqlx::Error> {
        let numbers = Self::list_numbers(pool, series_id, season_number).await?;
        Ok(studio_core::analytics::next_episode_number(numbers))
    }

    pub async fn exists(
        pool: &PgPool,
        series_id: DbId,
        season_number: i32,
        episode_number: i32,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM episodes \
             WHERE series_id = $1 AND season_number = $2 AND episode_number = $3)",
        )
        .bind(series_id)
        .bind(season_number)
        .bind(episode_number)
        .fetch_one(pool)
        .await
    }

    /// The episode numbered one lower in the same season.
    pub async fn find_previous(
        pool: &PgPool,
        episode: &Episode,
    ) -> Result<Option<Episode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM episodes \
             WHERE series_id = $1 AND season_number = $2 AND episode_number = $3"
        );
        sqlx::query_as::<_, Episode>(&query)
            .bind(episode.series_id)
            .bind(episode.season_number)
            .bind(episode.episode_number - 1)
            .fetch_optional(pool)
            .await
    }

    /// IDs of every episode in a season.
    pub async fn list_ids_for_season(
        pool: &PgPool,
        series_id: DbId,
        season_number: i32,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM episodes WHERE series_id = $1 AND season_number = $2",
        )
        .bind(series_id)
        .bind(season_number)
        .fetch_all(pool)
        .await
    }
}
