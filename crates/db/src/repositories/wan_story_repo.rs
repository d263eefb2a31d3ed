//! Repositories for `wan_stories` and `wan_story_segments`.

use sqlx::PgPool;
use studio_core::status::WanSegmentStatus;
use studio_core::types::DbId;

use crate::models::wan_story::{
    CreateWanStory, NewWanSegment, WanStory, WanStorySegment, WanStoryWithSegments,
};

const STORY_COLUMNS: &str = "id, title, premise, visual_style, status, created_at";

const SEGMENT_COLUMNS: &str = "id, story_id, segment_index, text_content, visual_prompt, \
     audio_url, video_url, status, dashscope_task_id, error_message, created_at, updated_at";

pub struct WanStoryRepo;

impl WanStoryRepo {
    /// Insert a `draft` story and its `pending` segments in one transaction.
    ///
    /// Segment indexes are 1-based.
    pub async fn create_with_segments(
        pool: &PgPool,
        input: &CreateWanStory,
        segments: &[NewWanSegment],
    ) -> Result<WanStoryWithSegments, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_story = format!(
            "INSERT INTO wan_stories (title, premise, visual_style, status) \
             VALUES ($1, $2, $3, 'draft') \
             RETURNING {STORY_COLUMNS}"
        );
        let story = sqlx::query_as::<_, WanStory>(&insert_story)
            .bind(&input.title)
            .bind(&input.premise)
            .bind(&input.visual_style)
            .fetch_one(&mut *tx)
            .await?;

        let insert_segment = format!(
            "INSERT INTO wan_story_segments \
                (story_id, segment_index, text_content, visual_prompt, status) \
             VALUES ($1, $2, $3, $4, 'pending') \
             RETURNING {SEGMENT_COLUMNS}"
        );
        let mut created = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let row = sqlx::query_as::<_, WanStorySegment>(&insert_segment)
                .bind(story.id)
                .bind(index as i32 + 1)
                .bind(&segment.text_content)
                .bind(&segment.visual_prompt)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok(WanStoryWithSegments {
            story,
            segments: created,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WanStory>, sqlx::Error> {
        let query = format!("SELECT {STORY_COLUMNS} FROM wan_stories WHERE id = $1");
        sqlx::query_as::<_, WanStory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Story with segments ordered by index.
    pub async fn find_with_segments(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WanStoryWithSegments>, sqlx::Error> {
        let Some(story) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let query = format!(
            "SELECT {SEGMENT_COLUMNS} FROM wan_story_segments \
             WHERE story_id = $1 ORDER BY segment_index ASC"
        );
        let segments = sqlx::query_as::<_, WanStorySegment>(&query)
            .bind(id)
            .fetch_all(pool)
            .await?;
        Ok(Some(WanStoryWithSegments { story, segments }))
    }
}

pub struct WanStorySegmentRepo;

impl WanStorySegmentRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        let query = format!("SELECT {SEGMENT_COLUMNS} FROM wan_story_segments WHERE id = $1");
        sqlx::query_as::<_, WanStorySegment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Store the submitted task id and move to `generating_video`.
    pub async fn set_task(
        pool: &PgPool,
        id: DbId,
        task_id: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        let query = format!(
            "UPDATE wan_story_segments SET dashscope_task_id = $2, status = $3, error_message = NULL \
             WHERE id = $1 \
             RETURNING {SEGMENT_COLUMNS}"
        );
        sqlx::query_as::<_, WanStorySegment>(&query)
            .bind(id)
            .bind(task_id)
            .bind(WanSegmentStatus::GeneratingVideo.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_video_ready(
        pool: &PgPool,
        id: DbId,
        video_url: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        let query = format!(
            "UPDATE wan_story_segments SET video_url = $2, status = $3 \
             WHERE id = $1 \
             RETURNING {SEGMENT_COLUMNS}"
        );
        sqlx::query_as::<_, WanStorySegment>(&query)
            .bind(id)
            .bind(video_url)
            .bind(WanSegmentStatus::VideoReady.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn set_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        let query = format!(
            "UPDATE wan_story_segments SET status = $2, error_message = $3 \
             WHERE id = $1 \
             RETURNING {SEGMENT_COLUMNS}"
        );
        sqlx::query_as::<_, WanStorySegment>(&query)
            .bind(id)
            .bind(WanSegmentStatus::Failed.as_str())
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }
}
