//! Dot-separated event type names.

pub const GENERATION_STARTED: &str = "generation.started";
pub const GENERATION_COMPLETED: &str = "generation.completed";
pub const GENERATION_FAILED: &str = "generation.failed";

/// A segment's image or audio URL changed.
pub const SEGMENT_ASSET_UPDATED: &str = "segment.asset_updated";
/// A segment's Wan clip state changed.
pub const SEGMENT_VIDEO_UPDATED: &str = "segment.video_updated";

pub const VIDEO_PROGRESS: &str = "video.progress";
pub const VIDEO_COMPLETED: &str = "video.completed";
pub const VIDEO_FAILED: &str = "video.failed";
