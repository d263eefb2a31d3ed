//! Owned object storage: buckets and key naming.
//!
//! Every object lives under a `{owner_id}/` prefix so that deleting a story
//! can remove all of its assets with one prefix listing per bucket.

use serde::Serialize;

use crate::types::DbId;

/// Default bucket names; overridable through configuration.
pub const DEFAULT_IMAGES_BUCKET: &str = "story-images";
pub const DEFAULT_AUDIO_BUCKET: &str = "story-audios";
pub const DEFAULT_VIDEO_BUCKET: &str = "story-videos";

/// Kind of object stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Images,
    Audio,
    Video,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Self::Images, Self::Audio, Self::Video];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Images => "png",
            Self::Audio => "mp3",
            Self::Video => "mp4",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Images => "image/png",
            Self::Audio => "audio/mpeg",
            Self::Video => "video/mp4",
        }
    }
}

/// Resolved bucket names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketNames {
    pub images: String,
    pub audio: String,
    pub video: String,
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            images: DEFAULT_IMAGES_BUCKET.to_string(),
            audio: DEFAULT_AUDIO_BUCKET.to_string(),
            video: DEFAULT_VIDEO_BUCKET.to_string(),
        }
    }
}

impl BucketNames {
    pub fn name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Images => &self.images,
            Bucket::Audio => &self.audio,
            Bucket::Video => &self.video,
        }
    }
}

/// Prefix under which all objects of an owner (story or episode) live.
pub fn owner_prefix(owner_id: DbId) -> String {
    format!("{owner_id}/")
}

/// `{owner_id}/segment-{index}-{millis}.{png|mp3}`.
pub fn segment_asset_key(owner_id: DbId, segment_index: i32, bucket: Bucket, millis: i64) -> String {
    format!(
        "{owner_id}/segment-{segment_index}-{millis}.{}",
        bucket.extension()
    )
}

/// `{owner_id}/full-story-{millis}.mp4`.
pub fn story_video_key(owner_id: DbId, millis: i64) -> String {
    format!("{owner_id}/full-story-{millis}.{}", Bucket::Video.extension())
}
