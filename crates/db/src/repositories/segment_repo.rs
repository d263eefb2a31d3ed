//! Repository for the `segments` table.

use sqlx::PgPool;
use studio_core::status::VideoStatus;
use studio_core::types::DbId;

use crate::models::segment::{CreateEpisodeSegment, Segment};
use crate::models::story::{CreateStory, Story};
use crate::repositories::story_repo::COLUMNS as STORY_COLUMNS;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, story_id, episode_id, segment_index, segment_type, \
     character_focus, text, visual_prompt, duration_seconds, image_url, audio_url, \
     video_url, video_status, video_asset_id, created_at";

/// Provides reads and per-column writers for segments.
pub struct SegmentRepo;

impl SegmentRepo {
    /// Create the backing story row for an episode and its segments in one
    /// transaction. Segments are linked to both parents.
    pub async fn create_for_episode(
        pool: &PgPool,
        episode_id: DbId,
        story: &CreateStory,
        segments: &[CreateEpisodeSegment],
    ) -> Result<(Story, Vec<Segment>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_story = format!(
            "INSERT INTO stories (base_idea, story_title, visual_style, script_tone, video_status) \
             VALUES ($1, $2, $3, $4, 'idle') \
             RETURNING {STORY_COLUMNS}"
        );
        let backing = sqlx::query_as::<_, Story>(&insert_story)
            .bind(&story.base_idea)
            .bind(&story.story_title)
            .bind(&story.visual_style)
            .bind(&story.script_tone)
            .fetch_one(&mut *tx)
            .await?;

        let insert_segment = format!(
            "INSERT INTO segments \
                (story_id, episode_id, segment_index, segment_type, character_focus, \
                 text, visual_prompt, duration_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(segments.len());
        for segment in segments {
            let row = sqlx::query_as::<_, Segment>(&insert_segment)
                .bind(backing.id)
                .bind(episode_id)
                .bind(segment.segment_index)
                .bind(&segment.segment_type)
                .bind(&segment.character_focus)
                .bind(&segment.text)
                .bind(&segment.visual_prompt)
                .bind(segment.duration_seconds)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok((backing, created))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Segment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM segments WHERE id = $1");
        sqlx::query_as::<_, Segment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Segments of a story in render order.
    pub async fn list_for_story(pool: &PgPool, story_id: DbId) -> Result<Vec<Segment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM segments WHERE story_id = $1 ORDER BY segment_index ASC"
        );
        sqlx::query_as::<_, Segment>(&query)
            .bind(story_id)
            .fetch_all(pool)
            .await
    }

    /// Segments of an episode in render order.
    pub async fn list_for_episode(
        pool: &PgPool,
        episode_id: DbId,
    ) -> Result<Vec<Segment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM segments WHERE episode_id = $1 ORDER BY segment_index ASC"
        );
        sqlx::query_as::<_, Segment>(&query)
            .bind(episode_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_story_and_index(
        pool: &PgPool,
        story_id: DbId,
        segment_index: i32,
    ) -> Result<Option<Segment>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM segments WHERE story_id = $1 AND segment_index = $2");
        sqlx::query_as::<_, Segment>(&query)
            .bind(story_id)
            .bind(segment_index)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_image_url(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<Option<Segment>, sqlx::Error> {
        let query = format!("UPDATE segments SET image_url = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Segment>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_audio_url(
        pool: &PgPool,
        id: DbId,
        url: &str,
    ) -> Result<Option<Segment>, sqlx::Error> {
        let query = format!("UPDATE segments SET audio_url = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Segment>(&query)
            .bind(id)
            .bind(url)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite the Wan clip columns.
    pub async fn update_clip(
        pool: &PgPool,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        video_asset_id: Option<&str>,
    ) -> Result<Option<Segment>, sqlx::Error> {
        let query = format!(
            "UPDATE segments SET video_url = $2, video_status = $3, video_asset_id = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Segment>(&query)
            .bind(id)
            .bind(video_url)
            .bind(status.as_str())
            .bind(video_asset_id)
            .fetch_optional(pool)
            .await
    }
}
