//! Persistence seams used by the runners.
//!
//! Runners that poll or loop (batches, video jobs, Wan clips) and the usage
//! recorder talk to the database through these traits so they can be driven
//! against in-memory stores in tests. [`PgStore`] is the production
//! implementation and simply delegates to the repositories.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studio_core::status::VideoStatus;
use studio_core::storage::Bucket;
use studio_core::types::{DbId, Timestamp};
use studio_db::models::generation::{CreateGeneration, Generation};
use studio_db::models::segment::Segment;
use studio_db::models::token_usage::{CreateTokenUsage, TokenUsage};
use studio_db::models::wan_story::WanStorySegment;
use studio_db::repositories::{
    EpisodeRepo, GenerationRepo, SegmentRepo, StoryRepo, TokenUsageRepo, WanStorySegmentRepo,
};
use studio_db::DbPool;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Which segments a batch runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SegmentParent {
    Story(DbId),
    Episode(DbId),
}

/// Per-segment asset produced by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Self::Image => Bucket::Images,
            Self::Audio => Bucket::Audio,
        }
    }

    /// The segment's current URL for this asset.
    pub fn current_url<'a>(&self, segment: &'a Segment) -> Option<&'a str> {
        match self {
            Self::Image => segment.image_url.as_deref(),
            Self::Audio => segment.audio_url.as_deref(),
        }
        .filter(|url| !url.is_empty())
    }
}

/// Which row's assembled-video columns a render job writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VideoTarget {
    Story(DbId),
    Episode(DbId),
}

impl VideoTarget {
    pub fn entity(&self) -> &'static str {
        match self {
            Self::Story(_) => "story",
            Self::Episode(_) => "episode",
        }
    }

    pub fn id(&self) -> DbId {
        match self {
            Self::Story(id) | Self::Episode(id) => *id,
        }
    }
}

/// Row filters for usage reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageFilter {
    Segment(DbId),
    Episode(DbId),
    Story(DbId),
    Character(DbId),
    /// Every row carrying the series id.
    Series(DbId),
    /// Series rows with no episode attached.
    SeriesLevel(DbId),
    Episodes(Vec<DbId>),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Segments of a story or episode, ascending by `segment_index`.
    async fn list_segments(&self, parent: SegmentParent) -> Result<Vec<Segment>, sqlx::Error>;

    async fn find_segment(&self, id: DbId) -> Result<Option<Segment>, sqlx::Error>;

    async fn set_segment_asset(
        &self,
        id: DbId,
        kind: AssetKind,
        url: &str,
    ) -> Result<Option<Segment>, sqlx::Error>;

    async fn update_clip(
        &self,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        video_asset_id: Option<&str>,
    ) -> Result<Option<Segment>, sqlx::Error>;
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Write the assembled-video columns. Returns `false` when the row is gone.
    async fn update_video(
        &self,
        target: VideoTarget,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) -> Result<bool, sqlx::Error>;
}

#[async_trait]
pub trait WanSegmentStore: Send + Sync {
    async fn find_wan_segment(&self, id: DbId) -> Result<Option<WanStorySegment>, sqlx::Error>;

    async fn set_wan_task(
        &self,
        id: DbId,
        task_id: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error>;

    async fn set_wan_video_ready(
        &self,
        id: DbId,
        video_url: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error>;

    async fn set_wan_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error>;
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn insert_usage(&self, input: &CreateTokenUsage) -> Result<TokenUsage, sqlx::Error>;

    async fn list_usage(&self, filter: UsageFilter) -> Result<Vec<TokenUsage>, sqlx::Error>;

    /// Episode ids of a series, optionally restricted to one season.
    async fn episode_ids(
        &self,
        series_id: DbId,
        season_number: Option<i32>,
    ) -> Result<Vec<DbId>, sqlx::Error>;
}

#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn create_generation(&self, input: &CreateGeneration) -> Result<Generation, sqlx::Error>;

    async fn complete_generation(
        &self,
        id: DbId,
        story_id: Option<DbId>,
        end_time: Timestamp,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error>;

    async fn fail_generation(
        &self,
        id: DbId,
        end_time: Timestamp,
        error: &str,
    ) -> Result<(), sqlx::Error>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

/// Store backed by the Postgres repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SegmentStore for PgStore {
    async fn list_segments(&self, parent: SegmentParent) -> Result<Vec<Segment>, sqlx::Error> {
        match parent {
            SegmentParent::Story(id) => SegmentRepo::list_for_story(&self.pool, id).await,
            SegmentParent::Episode(id) => SegmentRepo::list_for_episode(&self.pool, id).await,
        }
    }

    async fn find_segment(&self, id: DbId) -> Result<Option<Segment>, sqlx::Error> {
        SegmentRepo::find_by_id(&self.pool, id).await
    }

    async fn set_segment_asset(
        &self,
        id: DbId,
        kind: AssetKind,
        url: &str,
    ) -> Result<Option<Segment>, sqlx::Error> {
        match kind {
            AssetKind::Image => SegmentRepo::set_image_url(&self.pool, id, url).await,
            AssetKind::Audio => SegmentRepo::set_audio_url(&self.pool, id, url).await,
        }
    }

    async fn update_clip(
        &self,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        video_asset_id: Option<&str>,
    ) -> Result<Option<Segment>, sqlx::Error> {
        SegmentRepo::update_clip(&self.pool, id, video_url, status, video_asset_id).await
    }
}

#[async_trait]
impl VideoStore for PgStore {
    async fn update_video(
        &self,
        target: VideoTarget,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let found = match target {
            VideoTarget::Story(id) => StoryRepo::update_video(&self.pool, id, video_url, status, job_id)
                .await?
                .is_some(),
            VideoTarget::Episode(id) => {
                EpisodeRepo::update_video(&self.pool, id, video_url, status, job_id)
                    .await?
                    .is_some()
            }
        };
        Ok(found)
    }
}

#[async_trait]
impl WanSegmentStore for PgStore {
    async fn find_wan_segment(&self, id: DbId) -> Result<Option<WanStorySegment>, sqlx::Error> {
        WanStorySegmentRepo::find_by_id(&self.pool, id).await
    }

    async fn set_wan_task(
        &self,
        id: DbId,
        task_id: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        WanStorySegmentRepo::set_task(&self.pool, id, task_id).await
    }

    async fn set_wan_video_ready(
        &self,
        id: DbId,
        video_url: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        WanStorySegmentRepo::set_video_ready(&self.pool, id, video_url).await
    }

    async fn set_wan_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        WanStorySegmentRepo::set_failed(&self.pool, id, error_message).await
    }
}

#[async_trait]
impl UsageStore for PgStore {
    async fn insert_usage(&self, input: &CreateTokenUsage) -> Result<TokenUsage, sqlx::Error> {
        TokenUsageRepo::insert(&self.pool, input).await
    }

    async fn list_usage(&self, filter: UsageFilter) -> Result<Vec<TokenUsage>, sqlx::Error> {
        match filter {
            UsageFilter::Segment(id) => TokenUsageRepo::list_by_segment(&self.pool, id).await,
            UsageFilter::Episode(id) => TokenUsageRepo::list_by_episode(&self.pool, id).await,
            UsageFilter::Story(id) => TokenUsageRepo::list_by_story(&self.pool, id).await,
            UsageFilter::Character(id) => TokenUsageRepo::list_by_character(&self.pool, id).await,
            UsageFilter::Series(id) => TokenUsageRepo::list_by_series(&self.pool, id).await,
            UsageFilter::SeriesLevel(id) => TokenUsageRepo::list_series_level(&self.pool, id).await,
            UsageFilter::Episodes(ids) => TokenUsageRepo::list_by_episodes(&self.pool, &ids).await,
        }
    }

    async fn episode_ids(
        &self,
        series_id: DbId,
        season_number: Option<i32>,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        match season_number {
            Some(season) => EpisodeRepo::list_ids_for_season(&self.pool, series_id, season).await,
            None => Ok(EpisodeRepo::list_for_series(&self.pool, series_id, None)
                .await?
                .into_iter()
                .map(|e| e.id)
                .collect()),
        }
    }
}

#[async_trait]
impl GenerationStore for PgStore {
    async fn create_generation(&self, input: &CreateGeneration) -> Result<Generation, sqlx::Error> {
        GenerationRepo::create(&self.pool, input).await
    }

    async fn complete_generation(
        &self,
        id: DbId,
        story_id: Option<DbId>,
        end_time: Timestamp,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        GenerationRepo::complete(&self.pool, id, story_id, end_time, metadata).await?;
        Ok(())
    }

    async fn fail_generation(
        &self,
        id: DbId,
        end_time: Timestamp,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        GenerationRepo::fail(&self.pool, id, end_time, error).await?;
        Ok(())
    }
}
