//! ClipCraft render jobs and their poll loops.
//!
//! [`VideoJobPoller`] submits a story's (or episode's) segments to the
//! renderer, persists the job id, and polls the job on a background task
//! until it completes or fails. The finished file is re-hosted in the
//! video bucket before the row is marked `completed`. Stopping a poll is
//! local only; the remote job keeps running.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use studio_core::error::CoreError;
use studio_core::status::VideoStatus;
use studio_core::storage::{story_video_key, Bucket, BucketNames};
use studio_core::types::{epoch_millis, DbId};
use studio_db::models::segment::Segment;
use studio_events::{names, EventBus, PlatformEvent};
use studio_providers::{ObjectStore, RenderJobStatus, RenderSegment, RenderStatus, VideoRenderer};
use tokio::sync::{watch, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::store::{VideoStore, VideoTarget};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_FAILURE: &str = "Video generation failed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoJobState {
    pub status: VideoStatus,
    /// 0-100.
    pub progress: i16,
    pub message: Option<String>,
    pub job_id: Option<String>,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

impl VideoJobState {
    fn generating(job_id: &str) -> Self {
        Self {
            status: VideoStatus::Generating,
            progress: 0,
            message: Some("Rendering...".to_string()),
            job_id: Some(job_id.to_string()),
            video_url: None,
            error: None,
        }
    }
}

/// Renderer payload for a story's segments. Every segment needs both an
/// image and narration.
pub fn render_segments(story_id: DbId, segments: &[Segment]) -> Result<Vec<RenderSegment>, CoreError> {
    let missing: Vec<String> = segments
        .iter()
        .filter(|s| {
            s.image_url.as_deref().map_or(true, str::is_empty)
                || s.audio_url.as_deref().map_or(true, str::is_empty)
        })
        .map(|s| s.segment_index.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Segments missing image or audio: {}",
            missing.join(", ")
        )));
    }

    Ok(segments
        .iter()
        .map(|s| RenderSegment {
            id: s.id,
            story_id,
            segment_index: s.segment_index,
            text: s.text.clone(),
            image_url: s.image_url.clone().unwrap_or_default(),
            audio_url: s.audio_url.clone().unwrap_or_default(),
            duration_seconds: s.duration_seconds,
            visual_prompt: s.visual_prompt.clone(),
        })
        .collect())
}

/// Tracks one poll task per target.
pub struct VideoJobPoller {
    jobs: RwLock<HashMap<VideoTarget, ActiveJob>>,
    renderer: Arc<dyn VideoRenderer>,
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn ObjectStore>,
    buckets: BucketNames,
    events: Arc<EventBus>,
    interval: Duration,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

struct ActiveJob {
    state: watch::Receiver<VideoJobState>,
    task_handle: tokio::task::JoinHandle<()>,
    /// Child of the master token.
    cancel: CancellationToken,
}

impl VideoJobPoller {
    pub fn new(
        renderer: Arc<dyn VideoRenderer>,
        store: Arc<dyn VideoStore>,
        storage: Arc<dyn ObjectStore>,
        buckets: BucketNames,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            renderer,
            store,
            storage,
            buckets,
            events,
            interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Submit a render job and start polling it.
    ///
    /// Returns `Ok(None)` without contacting the renderer when there are no
    /// segments. A submit failure, or a failure to record the submitted job,
    /// marks the target `failed` and no poll loop is started.
    pub async fn start(
        self: &Arc<Self>,
        target: VideoTarget,
        segments: Vec<RenderSegment>,
    ) -> Result<Option<VideoJobState>, PipelineError> {
        if segments.is_empty() {
            tracing::debug!(?target, "No segments to render");
            return Ok(None);
        }

        let job_id = match self.renderer.submit(&segments).await {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(?target, error = %e, "Render submit failed");
                self.fail_start(target, e.to_string()).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .store
            .update_video(target, None, VideoStatus::Generating, Some(&job_id))
            .await
        {
            tracing::error!(?target, job_id = %job_id, error = %e, "Failed to record submitted render job");
            self.fail_start(target, e.to_string()).await;
            return Err(e.into());
        }
        tracing::info!(?target, job_id = %job_id, segments = segments.len(), "Render job submitted");

        Ok(Some(self.attach(target, job_id).await))
    }

    /// Re-attach a poll loop to a job submitted earlier, without resubmitting.
    pub async fn resume(self: &Arc<Self>, target: VideoTarget, job_id: String) -> VideoJobState {
        tracing::info!(?target, job_id = %job_id, "Resuming render poll");
        self.attach(target, job_id).await
    }

    /// Latest known state of the target's job.
    pub async fn state(&self, target: VideoTarget) -> Option<VideoJobState> {
        self.jobs
            .read()
            .await
            .get(&target)
            .map(|job| job.state.borrow().clone())
    }

    /// Number of poll loops still running.
    pub async fn active_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.task_handle.is_finished())
            .count()
    }

    /// Stop polling locally. Returns `false` if nothing was being tracked.
    pub async fn stop(&self, target: VideoTarget) -> bool {
        match self.jobs.write().await.remove(&target) {
            Some(job) => {
                job.cancel.cancel();
                tracing::info!(?target, "Render poll stopped");
                true
            }
            None => false,
        }
    }

    /// Cancel every poll loop and wait up to 5 seconds for each to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down video job poller");
        self.cancel.cancel();

        let mut jobs = self.jobs.write().await;
        for (target, job) in jobs.drain() {
            job.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, job.task_handle).await.is_err() {
                tracing::warn!(?target, "Render poll did not stop in time");
            }
        }

        tracing::info!("Video job poller shut down complete");
    }

    // ---- private helpers ----

    async fn attach(self: &Arc<Self>, target: VideoTarget, job_id: String) -> VideoJobState {
        let initial = VideoJobState::generating(&job_id);
        let (tx, rx) = watch::channel(initial.clone());
        let cancel = self.cancel.child_token();

        let poller = Arc::clone(self);
        let task_cancel = cancel.clone();
        let task_handle = tokio::spawn(async move {
            poller.poll_loop(target, job_id, tx, task_cancel).await;
        });

        let previous = self.jobs.write().await.insert(
            target,
            ActiveJob {
                state: rx,
                task_handle,
                cancel,
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        self.publish(target, names::VIDEO_PROGRESS, &initial);
        initial
    }

    async fn poll_loop(
        &self,
        target: VideoTarget,
        job_id: String,
        tx: watch::Sender<VideoJobState>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(?target, job_id = %job_id, "Render poll cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    match self.renderer.status(&job_id).await {
                        Ok(status) => {
                            if self.apply(target, &job_id, status, &tx).await {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(?target, job_id = %job_id, error = %e, "Render status poll failed");
                        }
                    }
                }
            }
        }
    }

    /// Fold one status response into the job state. Returns `true` once the
    /// job reached a terminal state.
    async fn apply(
        &self,
        target: VideoTarget,
        job_id: &str,
        status: RenderStatus,
        tx: &watch::Sender<VideoJobState>,
    ) -> bool {
        match (status.status, status.output_url) {
            (RenderJobStatus::Failed, _) => {
                let error = status.error.unwrap_or_else(|| DEFAULT_FAILURE.to_string());
                self.fail(target, job_id, error, tx).await;
                true
            }
            (RenderJobStatus::Completed, Some(output_url)) => {
                self.finish(target, job_id, &output_url, tx).await;
                true
            }
            _ => {
                tx.send_modify(|state| {
                    if let Some(progress) = &status.progress {
                        state.progress = progress.percent();
                        if let Some(message) = progress.message() {
                            state.message = Some(message.to_string());
                        }
                    }
                });
                self.publish(target, names::VIDEO_PROGRESS, &tx.borrow());
                false
            }
        }
    }

    async fn finish(
        &self,
        target: VideoTarget,
        job_id: &str,
        output_url: &str,
        tx: &watch::Sender<VideoJobState>,
    ) {
        let url = match self.rehost(target, output_url).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(?target, job_id, error = %e, "Failed to store rendered video");
                self.fail(target, job_id, e.to_string(), tx).await;
                return;
            }
        };

        self.persist(target, Some(&url), VideoStatus::Completed, Some(job_id))
            .await;
        tx.send_modify(|state| {
            state.status = VideoStatus::Completed;
            state.progress = 100;
            state.message = Some("Done!".to_string());
            state.video_url = Some(url.clone());
            state.error = None;
        });
        tracing::info!(?target, job_id, url = %url, "Render job completed");
        self.publish(target, names::VIDEO_COMPLETED, &tx.borrow());
    }

    async fn fail(
        &self,
        target: VideoTarget,
        job_id: &str,
        error: String,
        tx: &watch::Sender<VideoJobState>,
    ) {
        tracing::error!(?target, job_id, error = %error, "Render job failed");
        self.persist(target, None, VideoStatus::Failed, Some(job_id)).await;
        tx.send_modify(|state| {
            state.status = VideoStatus::Failed;
            state.error = Some(error);
        });
        self.publish(target, names::VIDEO_FAILED, &tx.borrow());
    }

    async fn rehost(&self, target: VideoTarget, output_url: &str) -> Result<String, PipelineError> {
        let bytes = self.renderer.download(output_url).await?;
        let key = story_video_key(target.id(), epoch_millis(Utc::now()));
        let url = self
            .storage
            .upload(
                self.buckets.name(Bucket::Video),
                &key,
                bytes,
                Bucket::Video.content_type(),
            )
            .await?;
        Ok(url)
    }

    /// Best-effort write of the video columns.
    async fn persist(
        &self,
        target: VideoTarget,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) {
        match self.store.update_video(target, video_url, status, job_id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(?target, "Video target no longer exists"),
            Err(e) => {
                tracing::error!(?target, status = %status, error = %e, "Failed to persist video state")
            }
        }
    }

    async fn fail_start(&self, target: VideoTarget, error: String) {
        self.persist(target, None, VideoStatus::Failed, None).await;
        self.publish(
            target,
            names::VIDEO_FAILED,
            &VideoJobState {
                status: VideoStatus::Failed,
                progress: 0,
                message: None,
                job_id: None,
                video_url: None,
                error: Some(error),
            },
        );
    }

    fn publish(&self, target: VideoTarget, event_type: &str, state: &VideoJobState) {
        self.events.publish(
            PlatformEvent::new(event_type)
                .with_source(target.entity(), target.id())
                .with_serialized(state),
        );
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;

    fn segment(index: i32, image: Option<&str>, audio: Option<&str>) -> Segment {
        Segment {
            id: 100 + i64::from(index),
            story_id: Some(1),
            episode_id: None,
            segment_index: index,
            segment_type: "main".into(),
            character_focus: None,
            text: format!("texto {index}"),
            visual_prompt: "prompt".into(),
            duration_seconds: 10,
            image_url: image.map(str::to_string),
            audio_url: audio.map(str::to_string),
            video_url: None,
            video_status: "idle".into(),
            video_asset_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn render_payload_requires_both_assets() {
        let segments = vec![
            segment(0, Some("i0"), Some("a0")),
            segment(1, Some("i1"), None),
            segment(2, Some(""), Some("a2")),
        ];
        assert_matches!(
            render_segments(1, &segments),
            Err(CoreError::Validation(msg)) if msg.ends_with("1, 2")
        );

        let ready = render_segments(1, &segments[..1]).unwrap();
        assert_eq!(ready[0].image_url, "i0");
        assert_eq!(ready[0].story_id, 1);
    }
}
