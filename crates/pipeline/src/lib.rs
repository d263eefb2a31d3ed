//! Generation orchestration: chat-written stories, series and episodes,
//! per-segment media batches, render jobs and Wan clips.
//!
//! Services that only create rows take a [`studio_db::DbPool`] directly.
//! Long-running runners go through the seams in [`store`] so they can be
//! exercised against in-memory stores.

pub mod activity;
pub mod batch;
pub mod characters;
mod chat_json;
pub mod episode;
pub mod error;
pub mod media;
pub mod prompts;
pub mod series;
pub mod store;
pub mod story;
pub mod usage;
pub mod video_job;
pub mod wan;

pub use activity::{ActivityHandle, ActivityTracker};
pub use batch::{BatchGenerator, BatchProgress, BatchReport, SegmentError};
pub use characters::CharacterService;
pub use episode::EpisodeService;
pub use error::PipelineError;
pub use media::MediaService;
pub use series::{CreateSeriesRequest, SeriesService};
pub use store::{AssetKind, PgStore, SegmentParent, VideoTarget};
pub use story::{GenerateStory, StoryService};
pub use usage::{UsageLinks, UsageRecorder, UsageScope};
pub use video_job::{VideoJobPoller, VideoJobState};
pub use wan::{SegmentVideoService, WanOrchestrator, WanStoryService, WanVideoTracker};
