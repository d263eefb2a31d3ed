//! Repository for the `stories` table.

use sqlx::PgPool;
use studio_core::status::VideoStatus;
use studio_core::types::DbId;

use crate::models::segment::Segment;
use crate::models::story::{CreateStory, NewStorySegment, Story};
use crate::repositories::segment_repo::COLUMNS as SEGMENT_COLUMNS;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, base_idea, story_title, visual_style, script_tone, \
     video_url, video_status, video_job_id, created_at, updated_at";

/// Provides CRUD operations for stories and their render state.
pub struct StoryRepo;

impl StoryRepo {
    /// Insert a story and its segments in one transaction.
    ///
    /// Segment indexes are 0-based positions in `segments`.
    pub async fn create_with_segments(
        pool: &PgPool,
        input: &CreateStory,
        segments: &[NewStorySegment],
    ) -> Result<(Story, Vec<Segment>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_story = format!(
            "INSERT INTO stories (base_idea, story_title, visual_style, script_tone) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let story = sqlx::query_as::<_, Story>(&insert_story)
            .bind(&input.base_idea)
            .bind(&input.story_title)
            .bind(&input.visual_style)
            .bind(&input.script_tone)
            .fetch_one(&mut *tx)
            .await?;

        let insert_segment = format!(
            "INSERT INTO segments (story_id, segment_index, text, visual_prompt, duration_seconds) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SEGMENT_COLUMNS}"
        );
        let mut created = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let row = sqlx::query_as::<_, Segment>(&insert_segment)
                .bind(story.id)
                .bind(index as i32)
                .bind(&segment.text)
                .bind(&segment.visual_prompt)
                .bind(segment.duration_seconds)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok((story, created))
    }

    /// Find a story by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories WHERE id = $1");
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List stories, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM stories ORDER BY created_at DESC, id DESC");
        sqlx::query_as::<_, Story>(&query).fetch_all(pool).await
    }

    /// Overwrite the render columns. Returns `None` if the story is gone.
    pub async fn update_video(
        pool: &PgPool,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) -> Result<Option<Story>, sqlx::Error> {
        let query = format!(
            "UPDATE stories SET video_url = $2, video_status = $3, video_job_id = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Story>(&query)
            .bind(id)
            .bind(video_url)
            .bind(status.as_str())
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Stories whose render was in flight when the process last stopped.
    pub async fn list_generating_videos(pool: &PgPool) -> Result<Vec<Story>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM stories \
             WHERE video_status = 'generating' AND video_job_id IS NOT NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, Story>(&query).fetch_all(pool).await
    }

    /// Delete a story; its segments cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
