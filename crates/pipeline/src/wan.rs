//! Wan text-to-video: premise stories, per-clip state machines and the
//! background tracker that advances in-flight clips.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use studio_core::segment_plan::WAN_CLIP_DURATION_SECS;
use studio_core::status::{GenerationType, VideoStatus, WanSegmentStatus};
use studio_core::types::DbId;
use studio_db::models::segment::Segment;
use studio_db::models::wan_story::{
    CreateWanStory, NewWanSegment, WanStorySegment, WanStoryWithSegments,
};
use studio_db::repositories::WanStoryRepo;
use studio_db::DbPool;
use studio_events::{names, EventBus, PlatformEvent};
use studio_providers::wan::WAN_MODEL;
use studio_providers::{ChatRequest, TextGenerator, VideoSynthesizer, WanRequest, WanTaskStatus};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::batch::SegmentError;
use crate::chat_json::chat_json;
use crate::error::PipelineError;
use crate::prompts;
use crate::store::{SegmentStore, WanSegmentStore};
use crate::usage::{MediaUsage, TextUsage, UsageLinks, UsageRecorder};

pub const WAN_STORY_CONTEXT: &str = "wan_story_generation";
pub const WAN_VIDEO_CONTEXT: &str = "wan_video_generation";

pub const DEFAULT_WAN_STYLE: &str = "Cinematic";
pub const DEFAULT_WAN_SEGMENTS: u32 = 3;

/// Error message stored when the Wan task could not be created.
pub const SUBMIT_FAILED_MESSAGE: &str = "Video Submit Failed";

pub const TRACKER_INTERVAL: Duration = Duration::from_secs(3);
pub const SUBMIT_PAUSE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Premise stories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedWanSegment {
    #[serde(default, alias = "text")]
    pub text_content: String,
    #[serde(default)]
    pub visual_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedWanStory {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub segments: Vec<GeneratedWanSegment>,
}

pub fn validate_wan_story(story: &GeneratedWanStory) -> Result<(), PipelineError> {
    if story.segments.is_empty() {
        return Err(PipelineError::IncompleteGeneration(
            "Wan story has no segments".to_string(),
        ));
    }
    if let Some(position) = story
        .segments
        .iter()
        .position(|s| s.visual_prompt.trim().is_empty())
    {
        return Err(PipelineError::IncompleteGeneration(format!(
            "Segment {} has no visual prompt",
            position + 1
        )));
    }
    Ok(())
}

pub struct WanStoryService {
    pool: DbPool,
    text: Arc<dyn TextGenerator>,
    usage: UsageRecorder,
}

impl WanStoryService {
    pub fn new(pool: DbPool, text: Arc<dyn TextGenerator>, usage: UsageRecorder) -> Self {
        Self { pool, text, usage }
    }

    /// Script a premise into clips and save it as a `draft` story.
    pub async fn generate_story_from_premise(
        &self,
        premise: &str,
        style: Option<&str>,
        segment_count: Option<u32>,
    ) -> Result<WanStoryWithSegments, PipelineError> {
        let style = style.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_WAN_STYLE);
        let count = segment_count.filter(|c| *c > 0).unwrap_or(DEFAULT_WAN_SEGMENTS);

        let request = ChatRequest::new(
            prompts::wan_story_system(style, count),
            prompts::wan_story_user(premise),
        )
        .temperature(0.7);
        let (generated, completion): (GeneratedWanStory, _) =
            chat_json(self.text.as_ref(), request, "wan story").await?;
        validate_wan_story(&generated)?;

        let segments: Vec<NewWanSegment> = generated
            .segments
            .into_iter()
            .map(|s| NewWanSegment {
                text_content: s.text_content,
                visual_prompt: s.visual_prompt,
            })
            .collect();
        let saved = WanStoryRepo::create_with_segments(
            &self.pool,
            &CreateWanStory {
                title: generated.title,
                premise: premise.to_string(),
                visual_style: style.to_string(),
            },
            &segments,
        )
        .await?;

        tracing::info!(
            wan_story_id = saved.story.id,
            segments = saved.segments.len(),
            "Wan story generated",
        );

        if let Some(usage) = completion.usage {
            self.usage
                .record_text_usage(TextUsage {
                    usage,
                    model: completion.model.clone(),
                    context_type: WAN_STORY_CONTEXT.to_string(),
                    links: UsageLinks::default(),
                    generation_id: None,
                    metadata: json!({ "wan_story_id": saved.story.id, "style": style }),
                })
                .await;
        }

        Ok(saved)
    }

    pub async fn get_story(&self, story_id: DbId) -> Result<WanStoryWithSegments, PipelineError> {
        WanStoryRepo::find_with_segments(&self.pool, story_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("wan_story", story_id))
    }
}

// ---------------------------------------------------------------------------
// Wan story segments
// ---------------------------------------------------------------------------

/// Advances one `wan_story_segments` row per call.
pub struct WanOrchestrator {
    store: Arc<dyn WanSegmentStore>,
    video: Arc<dyn VideoSynthesizer>,
    usage: UsageRecorder,
}

impl WanOrchestrator {
    pub fn new(
        store: Arc<dyn WanSegmentStore>,
        video: Arc<dyn VideoSynthesizer>,
        usage: UsageRecorder,
    ) -> Self {
        Self {
            store,
            video,
            usage,
        }
    }

    /// Submit the clip if it was never submitted, otherwise check on it.
    /// Terminal rows are returned untouched.
    pub async fn process_segment(&self, segment_id: DbId) -> Result<WanStorySegment, PipelineError> {
        let segment = self
            .store
            .find_wan_segment(segment_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("wan_story_segment", segment_id))?;
        let status = WanSegmentStatus::from_str(&segment.status)?;

        if status.is_terminal() {
            return Ok(segment);
        }

        let task_id = segment.dashscope_task_id.clone();
        let has_video = segment.video_url.is_some();
        match task_id {
            None if !has_video => self.submit(segment).await,
            Some(task_id) if status == WanSegmentStatus::GeneratingVideo => {
                self.check(segment, &task_id).await
            }
            _ => Ok(segment),
        }
    }

    async fn submit(&self, segment: WanStorySegment) -> Result<WanStorySegment, PipelineError> {
        let prompt = format!("{}. {}", segment.visual_prompt, segment.text_content);
        let request = WanRequest::new(prompt)
            .audio_url(segment.audio_url.clone())
            .duration(WAN_CLIP_DURATION_SECS as u32);

        match self.video.submit(&request).await {
            Ok(task_id) => {
                tracing::info!(segment_id = segment.id, task_id = %task_id, "Wan clip submitted");
                self.usage
                    .record_media_usage(MediaUsage {
                        generation_type: GenerationType::Video,
                        model: WAN_MODEL.to_string(),
                        context_type: WAN_VIDEO_CONTEXT.to_string(),
                        links: UsageLinks::default(),
                        metadata: json!({
                            "wan_story_id": segment.story_id,
                            "wan_segment_id": segment.id,
                            "duration": WAN_CLIP_DURATION_SECS,
                        }),
                    })
                    .await;
                Ok(self.store.set_wan_task(segment.id, &task_id).await?.unwrap_or(segment))
            }
            Err(e) => {
                tracing::error!(segment_id = segment.id, error = %e, "Wan clip submit failed");
                Ok(self
                    .store
                    .set_wan_failed(segment.id, SUBMIT_FAILED_MESSAGE)
                    .await?
                    .unwrap_or(segment))
            }
        }
    }

    async fn check(
        &self,
        segment: WanStorySegment,
        task_id: &str,
    ) -> Result<WanStorySegment, PipelineError> {
        let status = match self.video.task_status(task_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(segment_id = segment.id, task_id, error = %e, "Wan task query failed");
                return Ok(segment);
            }
        };

        let updated = match status {
            WanTaskStatus::Pending => return Ok(segment),
            WanTaskStatus::Completed { video_url } => {
                tracing::info!(segment_id = segment.id, "Wan clip ready");
                self.store.set_wan_video_ready(segment.id, &video_url).await?
            }
            WanTaskStatus::Failed { message } => {
                tracing::warn!(segment_id = segment.id, message = %message, "Wan clip failed");
                self.store.set_wan_failed(segment.id, &message).await?
            }
        };
        Ok(updated.unwrap_or(segment))
    }
}

// ---------------------------------------------------------------------------
// Clips on story/episode segments
// ---------------------------------------------------------------------------

pub fn clip_prompt(segment: &Segment) -> String {
    format!(
        "Visual: {} \n\nContext/Narration: {}",
        segment.visual_prompt, segment.text
    )
}

/// Advances the Wan clip of one `segments` row per call.
pub struct SegmentVideoService {
    segments: Arc<dyn SegmentStore>,
    video: Arc<dyn VideoSynthesizer>,
    usage: UsageRecorder,
}

impl SegmentVideoService {
    pub fn new(
        segments: Arc<dyn SegmentStore>,
        video: Arc<dyn VideoSynthesizer>,
        usage: UsageRecorder,
    ) -> Self {
        Self {
            segments,
            video,
            usage,
        }
    }

    /// Submit an `idle` or `failed` clip, or check a `generating` one that has
    /// a task id. Any other row comes back unchanged.
    pub async fn process_segment(&self, segment_id: DbId) -> Result<Segment, PipelineError> {
        let segment = self
            .segments
            .find_segment(segment_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("segment", segment_id))?;

        match VideoStatus::from_str(&segment.video_status) {
            Ok(VideoStatus::Idle | VideoStatus::Failed) => self.submit(segment).await,
            Ok(VideoStatus::Generating) => match segment.video_asset_id.clone() {
                Some(task_id) => self.check(segment, &task_id).await,
                None => Ok(segment),
            },
            // Completed, or a status nothing here can advance.
            _ => Ok(segment),
        }
    }

    async fn submit(&self, segment: Segment) -> Result<Segment, PipelineError> {
        let request = WanRequest::new(clip_prompt(&segment))
            .audio_url(segment.audio_url.clone().filter(|u| !u.is_empty()))
            .duration(WAN_CLIP_DURATION_SECS as u32);

        let task_id = match self.video.submit(&request).await {
            Ok(task_id) => task_id,
            Err(e) => {
                tracing::error!(segment_id = segment.id, error = %e, "Segment clip submit failed");
                self.segments
                    .update_clip(segment.id, None, VideoStatus::Failed, None)
                    .await?;
                return Err(e.into());
            }
        };

        tracing::info!(segment_id = segment.id, task_id = %task_id, "Segment clip submitted");
        let mut links = UsageLinks::default().with_segment(segment.id);
        links.story_id = segment.story_id;
        links.episode_id = segment.episode_id;
        self.usage
            .record_media_usage(MediaUsage {
                generation_type: GenerationType::Video,
                model: WAN_MODEL.to_string(),
                context_type: WAN_VIDEO_CONTEXT.to_string(),
                links,
                metadata: json!({ "duration": WAN_CLIP_DURATION_SECS }),
            })
            .await;

        Ok(self
            .segments
            .update_clip(segment.id, None, VideoStatus::Generating, Some(&task_id))
            .await?
            .unwrap_or(segment))
    }

    async fn check(&self, segment: Segment, task_id: &str) -> Result<Segment, PipelineError> {
        let status = match self.video.task_status(task_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(segment_id = segment.id, task_id, error = %e, "Segment clip query failed");
                return Ok(segment);
            }
        };

        let updated = match status {
            WanTaskStatus::Pending => return Ok(segment),
            WanTaskStatus::Completed { video_url } => {
                self.segments
                    .update_clip(segment.id, Some(&video_url), VideoStatus::Completed, Some(task_id))
                    .await?
            }
            WanTaskStatus::Failed { message } => {
                tracing::warn!(segment_id = segment.id, message = %message, "Segment clip failed");
                self.segments
                    .update_clip(segment.id, None, VideoStatus::Failed, Some(task_id))
                    .await?
            }
        };
        Ok(updated.unwrap_or(segment))
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClipBatchReport {
    pub submitted: usize,
    pub skipped: usize,
    pub errors: Vec<SegmentError>,
}

/// Keeps the set of in-flight segment clips and re-checks them on a timer.
pub struct WanVideoTracker {
    service: Arc<SegmentVideoService>,
    events: Arc<EventBus>,
    active: Mutex<HashSet<DbId>>,
    interval: Duration,
    submit_pause: Duration,
}

impl WanVideoTracker {
    pub fn new(service: Arc<SegmentVideoService>, events: Arc<EventBus>) -> Self {
        Self {
            service,
            events,
            active: Mutex::new(HashSet::new()),
            interval: TRACKER_INTERVAL,
            submit_pause: SUBMIT_PAUSE,
        }
    }

    pub async fn is_tracking(&self, segment_id: DbId) -> bool {
        self.active.lock().await.contains(&segment_id)
    }

    /// Start (or advance) one clip. Returns `Ok(None)` when the segment is
    /// already being tracked.
    pub async fn generate_segment(&self, segment_id: DbId) -> Result<Option<Segment>, PipelineError> {
        if !self.active.lock().await.insert(segment_id) {
            return Ok(None);
        }

        match self.service.process_segment(segment_id).await {
            Ok(segment) => {
                self.publish(&segment);
                if is_settled(&segment) {
                    self.active.lock().await.remove(&segment_id);
                }
                Ok(Some(segment))
            }
            Err(e) => {
                self.active.lock().await.remove(&segment_id);
                Err(e)
            }
        }
    }

    /// Submit every segment that has no clip in progress or done, one at a
    /// time with a short pause between submissions.
    pub async fn generate_all(&self, segments: &[Segment]) -> ClipBatchReport {
        let mut report = ClipBatchReport::default();
        let mut pending = Vec::new();
        {
            let active = self.active.lock().await;
            for segment in segments {
                let status = VideoStatus::from_str(&segment.video_status).unwrap_or(VideoStatus::Idle);
                if matches!(status, VideoStatus::Completed | VideoStatus::Generating)
                    || active.contains(&segment.id)
                {
                    report.skipped += 1;
                } else {
                    pending.push(segment);
                }
            }
        }

        for (position, segment) in pending.into_iter().enumerate() {
            if position > 0 {
                tokio::time::sleep(self.submit_pause).await;
            }
            match self.generate_segment(segment.id).await {
                Ok(Some(_)) => report.submitted += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => report.errors.push(SegmentError {
                    segment_index: segment.segment_index,
                    message: e.to_string(),
                }),
            }
        }

        tracing::info!(
            submitted = report.submitted,
            skipped = report.skipped,
            failed = report.errors.len(),
            "Clip batch submitted",
        );
        report
    }

    /// Re-process every tracked clip once.
    pub async fn tick(&self) {
        let ids: Vec<DbId> = self.active.lock().await.iter().copied().collect();
        for id in ids {
            match self.service.process_segment(id).await {
                Ok(segment) => {
                    self.publish(&segment);
                    if is_settled(&segment) {
                        self.active.lock().await.remove(&id);
                    }
                }
                Err(e) => {
                    tracing::warn!(segment_id = id, error = %e, "Clip status check failed");
                }
            }
        }
    }

    /// Tick until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Clip tracker stopped");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    fn publish(&self, segment: &Segment) {
        self.events.publish(
            PlatformEvent::new(names::SEGMENT_VIDEO_UPDATED)
                .with_source("segment", segment.id)
                .with_serialized(segment),
        );
    }
}

/// Only a `generating` clip with a task id can still change on a tick.
fn is_settled(segment: &Segment) -> bool {
    let polling = VideoStatus::from_str(&segment.video_status)
        .is_ok_and(|s| s == VideoStatus::Generating);
    !(polling && segment.video_asset_id.is_some())
}
