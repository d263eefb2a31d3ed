//! Sequential image/audio generation over a story's or episode's segments.
//!
//! A batch walks the segments in index order, skips those that already have
//! the asset, and re-hosts every new asset in the owned bucket. One failing
//! segment never stops the batch; it is recorded in the report instead.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use studio_core::storage::{segment_asset_key, BucketNames};
use studio_core::types::{epoch_millis, DbId};
use studio_db::models::segment::Segment;
use studio_events::{names, EventBus, PlatformEvent};
use studio_providers::ObjectStore;
use tokio::sync::watch;

use crate::error::PipelineError;
use crate::media::MediaService;
use crate::store::{AssetKind, SegmentParent, SegmentStore};
use crate::usage::UsageLinks;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentError {
    pub segment_index: i32,
    pub message: String,
}

/// Live view of a running batch, pushed through a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub kind: AssetKind,
    pub running: bool,
    pub total: usize,
    pub completed: usize,
    pub current_index: Option<i32>,
    pub errors: Vec<SegmentError>,
}

impl BatchProgress {
    pub fn idle(kind: AssetKind) -> Self {
        Self {
            kind,
            running: false,
            total: 0,
            completed: 0,
            current_index: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    pub errors: Vec<SegmentError>,
    /// Assets kept at the provider URL because re-hosting failed.
    pub fallbacks: usize,
}

/// Outcome of producing one asset.
struct Produced {
    segment: Segment,
    upload_fallback: bool,
}

pub struct BatchGenerator {
    segments: Arc<dyn SegmentStore>,
    media: Arc<MediaService>,
    storage: Arc<dyn ObjectStore>,
    buckets: BucketNames,
    events: Arc<EventBus>,
}

impl BatchGenerator {
    pub fn new(
        segments: Arc<dyn SegmentStore>,
        media: Arc<MediaService>,
        storage: Arc<dyn ObjectStore>,
        buckets: BucketNames,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            segments,
            media,
            storage,
            buckets,
            events,
        }
    }

    /// Generate `kind` for every segment of `parent` that lacks it.
    ///
    /// Only listing the segments can fail the call; per-segment failures
    /// land in [`BatchReport::errors`].
    pub async fn generate_all(
        &self,
        parent: SegmentParent,
        kind: AssetKind,
        style: &str,
        progress: &watch::Sender<BatchProgress>,
    ) -> Result<BatchReport, PipelineError> {
        let mut segments = self.segments.list_segments(parent).await?;
        segments.sort_by_key(|s| s.segment_index);

        let mut report = BatchReport {
            total: segments.len(),
            ..Default::default()
        };
        progress.send_replace(BatchProgress {
            kind,
            running: true,
            total: report.total,
            completed: 0,
            current_index: None,
            errors: Vec::new(),
        });
        tracing::info!(?parent, kind = kind.as_str(), total = report.total, "Batch started");

        for segment in &segments {
            let index = segment.segment_index;

            if kind.current_url(segment).is_some() {
                report.completed += 1;
                publish_progress(progress, &report, Some(index));
                continue;
            }
            publish_progress(progress, &report, Some(index));

            match self.produce(parent, segment, kind, style).await {
                Ok(produced) => {
                    report.completed += 1;
                    if produced.upload_fallback {
                        report.fallbacks += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        segment_id = segment.id,
                        segment_index = index,
                        kind = kind.as_str(),
                        error = %e,
                        "Segment generation failed",
                    );
                    report.errors.push(SegmentError {
                        segment_index: index,
                        message: e.to_string(),
                    });
                }
            }
            publish_progress(progress, &report, Some(index));
        }

        progress.send_modify(|p| {
            p.running = false;
            p.current_index = None;
        });
        tracing::info!(
            ?parent,
            kind = kind.as_str(),
            completed = report.completed,
            failed = report.errors.len(),
            fallbacks = report.fallbacks,
            "Batch finished",
        );
        Ok(report)
    }

    /// Generate `kind` for one segment even if it already has it.
    ///
    /// The segment's entry in the batch's error list is cleared before the
    /// call and replaced on failure. Both edits go through `progress` so
    /// other entries are left alone.
    pub async fn regenerate(
        &self,
        segment_id: DbId,
        kind: AssetKind,
        style: &str,
        progress: &watch::Sender<BatchProgress>,
    ) -> Result<Segment, PipelineError> {
        let segment = self
            .segments
            .find_segment(segment_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("segment", segment_id))?;
        let parent = match (segment.episode_id, segment.story_id) {
            (Some(episode_id), _) => SegmentParent::Episode(episode_id),
            (None, Some(story_id)) => SegmentParent::Story(story_id),
            (None, None) => SegmentParent::Story(segment.owner_id()),
        };
        let index = segment.segment_index;
        progress.send_modify(|p| p.errors.retain(|e| e.segment_index != index));

        match self.produce(parent, &segment, kind, style).await {
            Ok(produced) => Ok(produced.segment),
            Err(e) => {
                progress.send_modify(|p| {
                    p.errors.push(SegmentError {
                        segment_index: index,
                        message: e.to_string(),
                    });
                });
                Err(e)
            }
        }
    }

    // ---- private helpers ----

    async fn produce(
        &self,
        parent: SegmentParent,
        segment: &Segment,
        kind: AssetKind,
        style: &str,
    ) -> Result<Produced, PipelineError> {
        let links = segment_links(parent, segment.id);
        let provider_url = match kind {
            AssetKind::Image => {
                self.media
                    .generate_image(&segment.visual_prompt, style, None, links)
                    .await?
            }
            AssetKind::Audio => self.media.generate_audio(&segment.text, None, links).await?,
        };

        let (url, upload_fallback) = match self.rehost(segment, kind, &provider_url).await {
            Ok(url) => (url, false),
            Err(e) => {
                tracing::warn!(
                    segment_id = segment.id,
                    kind = kind.as_str(),
                    error = %e,
                    "UploadFallback: keeping provider URL",
                );
                (provider_url, true)
            }
        };

        let updated = self
            .segments
            .set_segment_asset(segment.id, kind, &url)
            .await?
            .ok_or_else(|| PipelineError::not_found("segment", segment.id))?;

        self.events.publish(
            PlatformEvent::new(names::SEGMENT_ASSET_UPDATED)
                .with_source("segment", updated.id)
                .with_serialized(&updated),
        );
        Ok(Produced {
            segment: updated,
            upload_fallback,
        })
    }

    /// Copy the provider asset into the owned bucket.
    async fn rehost(
        &self,
        segment: &Segment,
        kind: AssetKind,
        provider_url: &str,
    ) -> Result<String, PipelineError> {
        let bucket = kind.bucket();
        let bytes = self.storage.fetch(provider_url).await?;
        let key = segment_asset_key(
            segment.owner_id(),
            segment.segment_index,
            bucket,
            epoch_millis(Utc::now()),
        );
        let url = self
            .storage
            .upload(self.buckets.name(bucket), &key, bytes, bucket.content_type())
            .await?;
        Ok(url)
    }
}

fn segment_links(parent: SegmentParent, segment_id: DbId) -> UsageLinks {
    let links = match parent {
        SegmentParent::Story(story_id) => UsageLinks::story(story_id),
        SegmentParent::Episode(episode_id) => UsageLinks {
            episode_id: Some(episode_id),
            ..Default::default()
        },
    };
    links.with_segment(segment_id)
}

fn publish_progress(
    progress: &watch::Sender<BatchProgress>,
    report: &BatchReport,
    current_index: Option<i32>,
) {
    progress.send_modify(|p| {
        p.completed = report.completed;
        p.current_index = current_index;
        p.errors = report.errors.clone();
    });
}
