//! In-memory stores and providers for driving the runners.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use studio_core::status::VideoStatus;
use studio_core::types::{DbId, Timestamp};
use studio_db::models::generation::{CreateGeneration, Generation};
use studio_db::models::segment::Segment;
use studio_db::models::token_usage::{CreateTokenUsage, TokenUsage};
use studio_db::models::wan_story::WanStorySegment;
use studio_events::EventBus;
use studio_pipeline::store::{
    AssetKind, GenerationStore, SegmentParent, SegmentStore, UsageFilter, UsageStore, VideoStore,
    VideoTarget, WanSegmentStore,
};
use studio_pipeline::{MediaService, UsageRecorder};
use studio_providers::{
    ImageGenerator, ObjectStore, ProviderError, RenderSegment, RenderStatus, SpeechGenerator,
    VideoRenderer, VideoSynthesizer, WanRequest, WanTaskStatus,
};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

pub fn segment(id: DbId, story_id: DbId, index: i32) -> Segment {
    Segment {
        id,
        story_id: Some(story_id),
        episode_id: None,
        segment_index: index,
        segment_type: "main".into(),
        character_focus: None,
        text: format!("Narración {index}"),
        visual_prompt: format!("Escena {index}"),
        duration_seconds: 10,
        image_url: None,
        audio_url: None,
        video_url: None,
        video_status: "idle".into(),
        video_asset_id: None,
        created_at: Utc::now(),
    }
}

pub fn wan_segment(id: DbId) -> WanStorySegment {
    WanStorySegment {
        id,
        story_id: 1,
        segment_index: 1,
        text_content: "Se abre la puerta".into(),
        visual_prompt: "Pasillo oscuro".into(),
        audio_url: None,
        video_url: None,
        status: "pending".into(),
        dashscope_task_id: None,
        error_message: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn render_segment(id: DbId) -> RenderSegment {
    RenderSegment {
        id,
        story_id: 1,
        segment_index: 0,
        text: "Hola".into(),
        image_url: "https://storage/img.png".into(),
        audio_url: "https://storage/a.mp3".into(),
        duration_seconds: 10,
        visual_prompt: "p".into(),
    }
}

/// A video-column write: `(target, url, status, job_id)`.
pub type VideoWrite = (VideoTarget, Option<String>, VideoStatus, Option<String>);

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    pub segments: Mutex<Vec<Segment>>,
    pub wan_segments: Mutex<Vec<WanStorySegment>>,
    pub video_writes: Mutex<Vec<VideoWrite>>,
    /// Writes of this video status fail without being recorded.
    pub reject_video_status: Option<VideoStatus>,
    pub usage: Mutex<Vec<TokenUsage>>,
    pub generations: Mutex<Vec<Generation>>,
}

impl MemoryStore {
    pub fn with_segments(segments: Vec<Segment>) -> Arc<Self> {
        Arc::new(Self {
            segments: Mutex::new(segments),
            ..Default::default()
        })
    }

    pub fn with_wan_segments(segments: Vec<WanStorySegment>) -> Arc<Self> {
        Arc::new(Self {
            wan_segments: Mutex::new(segments),
            ..Default::default()
        })
    }

    pub fn segment(&self, id: DbId) -> Segment {
        self.segments
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap()
    }

    pub fn wan_segment(&self, id: DbId) -> WanStorySegment {
        self.wan_segments
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap()
    }

    pub fn last_video_write(&self) -> Option<VideoWrite> {
        self.video_writes.lock().unwrap().last().cloned()
    }

    fn update_segment(&self, id: DbId, f: impl FnOnce(&mut Segment)) -> Option<Segment> {
        let mut segments = self.segments.lock().unwrap();
        let segment = segments.iter_mut().find(|s| s.id == id)?;
        f(segment);
        Some(segment.clone())
    }

    fn update_wan(&self, id: DbId, f: impl FnOnce(&mut WanStorySegment)) -> Option<WanStorySegment> {
        let mut segments = self.wan_segments.lock().unwrap();
        let segment = segments.iter_mut().find(|s| s.id == id)?;
        f(segment);
        Some(segment.clone())
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn list_segments(&self, parent: SegmentParent) -> Result<Vec<Segment>, sqlx::Error> {
        let mut rows: Vec<Segment> = self
            .segments
            .lock()
            .unwrap()
            .iter()
            .filter(|s| match parent {
                SegmentParent::Story(id) => s.story_id == Some(id),
                SegmentParent::Episode(id) => s.episode_id == Some(id),
            })
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.segment_index);
        Ok(rows)
    }

    async fn find_segment(&self, id: DbId) -> Result<Option<Segment>, sqlx::Error> {
        Ok(self.segments.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn set_segment_asset(
        &self,
        id: DbId,
        kind: AssetKind,
        url: &str,
    ) -> Result<Option<Segment>, sqlx::Error> {
        Ok(self.update_segment(id, |s| match kind {
            AssetKind::Image => s.image_url = Some(url.to_string()),
            AssetKind::Audio => s.audio_url = Some(url.to_string()),
        }))
    }

    async fn update_clip(
        &self,
        id: DbId,
        video_url: Option<&str>,
        status: VideoStatus,
        video_asset_id: Option<&str>,
    ) -> Result<Option<Segment>, sqlx::Error> {
        Ok(self.update_segment(id, |s| {
            s.video_url = video_url.map(str::to_string);
            s.video_status = status.as_str().to_string();
            s.video_asset_id = video_asset_id.map(str::to_string);
        }))
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn update_video(
        &self,
        target: VideoTarget,
        video_url: Option<&str>,
        status: VideoStatus,
        job_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        if self.reject_video_status == Some(status) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.video_writes.lock().unwrap().push((
            target,
            video_url.map(str::to_string),
            status,
            job_id.map(str::to_string),
        ));
        Ok(true)
    }
}

#[async_trait]
impl WanSegmentStore for MemoryStore {
    async fn find_wan_segment(&self, id: DbId) -> Result<Option<WanStorySegment>, sqlx::Error> {
        Ok(self.wan_segments.lock().unwrap().iter().find(|s| s.id == id).cloned())
    }

    async fn set_wan_task(
        &self,
        id: DbId,
        task_id: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        Ok(self.update_wan(id, |s| {
            s.dashscope_task_id = Some(task_id.to_string());
            s.status = "generating_video".into();
            s.error_message = None;
        }))
    }

    async fn set_wan_video_ready(
        &self,
        id: DbId,
        video_url: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        Ok(self.update_wan(id, |s| {
            s.video_url = Some(video_url.to_string());
            s.status = "video_ready".into();
        }))
    }

    async fn set_wan_failed(
        &self,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<WanStorySegment>, sqlx::Error> {
        Ok(self.update_wan(id, |s| {
            s.status = "failed".into();
            s.error_message = Some(error_message.to_string());
        }))
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn insert_usage(&self, input: &CreateTokenUsage) -> Result<TokenUsage, sqlx::Error> {
        let mut rows = self.usage.lock().unwrap();
        let row = TokenUsage {
            id: rows.len() as DbId + 1,
            generation_type: input.generation_type.clone(),
            model_used: input.model_used.clone(),
            provider: input.provider.clone(),
            prompt_tokens: input.prompt_tokens,
            completion_tokens: input.completion_tokens,
            total_tokens: input.total_tokens,
            context_type: input.context_type.clone(),
            series_id: input.series_id,
            episode_id: input.episode_id,
            segment_id: input.segment_id,
            story_id: input.story_id,
            character_id: input.character_id,
            generation_id: input.generation_id,
            estimated_cost_usd: input.estimated_cost_usd,
            metadata: input.metadata.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn list_usage(&self, filter: UsageFilter) -> Result<Vec<TokenUsage>, sqlx::Error> {
        let rows = self.usage.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| match &filter {
                UsageFilter::Segment(id) => r.segment_id == Some(*id),
                UsageFilter::Episode(id) => r.episode_id == Some(*id),
                UsageFilter::Story(id) => r.story_id == Some(*id),
                UsageFilter::Character(id) => r.character_id == Some(*id),
                UsageFilter::Series(id) => r.series_id == Some(*id),
                UsageFilter::SeriesLevel(id) => r.series_id == Some(*id) && r.episode_id.is_none(),
                UsageFilter::Episodes(ids) => r.episode_id.is_some_and(|e| ids.contains(&e)),
            })
            .cloned()
            .collect())
    }

    async fn episode_ids(
        &self,
        series_id: DbId,
        _season_number: Option<i32>,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows = self.usage.lock().unwrap();
        let ids: HashSet<DbId> = rows
            .iter()
            .filter(|r| r.series_id == Some(series_id))
            .filter_map(|r| r.episode_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn create_generation(&self, input: &CreateGeneration) -> Result<Generation, sqlx::Error> {
        let mut rows = self.generations.lock().unwrap();
        let row = Generation {
            id: rows.len() as DbId + 1,
            kind: input.kind.clone(),
            status: "pending".into(),
            provider: input.provider.clone(),
            story_id: input.story_id,
            metadata: input.metadata.clone().unwrap_or_default(),
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn complete_generation(
        &self,
        id: DbId,
        story_id: Option<DbId>,
        end_time: Timestamp,
        _metadata: Option<&serde_json::Value>,
    ) -> Result<(), sqlx::Error> {
        let mut rows = self.generations.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = "completed".into();
            row.story_id = story_id.or(row.story_id);
            row.end_time = Some(end_time);
        }
        Ok(())
    }

    async fn fail_generation(
        &self,
        id: DbId,
        end_time: Timestamp,
        _error: &str,
    ) -> Result<(), sqlx::Error> {
        let mut rows = self.generations.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.status = "failed".into();
            row.end_time = Some(end_time);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Image and speech generator. Prompts containing `"boom"` fail.
#[derive(Default)]
pub struct FakeMedia {
    pub calls: Mutex<Vec<String>>,
}

impl FakeMedia {
    fn answer(&self, input: &str, ext: &str) -> Result<String, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(input.to_string());
        if input.contains("boom") {
            return Err(ProviderError::GenerationFailed("provider exploded".into()));
        }
        Ok(format!("https://provider/asset-{}.{ext}", calls.len()))
    }
}

#[async_trait]
impl ImageGenerator for FakeMedia {
    async fn generate_image(&self, prompt: &str, _style: &str) -> Result<String, ProviderError> {
        self.answer(prompt, "png")
    }
}

#[async_trait]
impl SpeechGenerator for FakeMedia {
    async fn generate_audio(&self, text: &str) -> Result<String, ProviderError> {
        self.answer(text, "mp3")
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub fail_uploads: bool,
    pub uploads: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ObjectStore for FakeStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ProviderError> {
        if self.fail_uploads {
            return Err(ProviderError::Storage("bucket unavailable".into()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(format!("https://storage/{bucket}/{key}"))
    }

    async fn remove_prefix(&self, _bucket: &str, _prefix: &str) -> Result<usize, ProviderError> {
        Ok(0)
    }

    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(vec![1, 2, 3])
    }
}

/// Renderer answering status polls from a script; an exhausted script
/// keeps answering `processing`.
#[derive(Default)]
pub struct FakeRenderer {
    pub fail_submit: bool,
    pub script: Mutex<VecDeque<Result<RenderStatus, ProviderError>>>,
    pub status_calls: Mutex<usize>,
    pub submitted: Mutex<Vec<usize>>,
}

impl FakeRenderer {
    pub fn scripted(statuses: Vec<Result<RenderStatus, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(statuses.into()),
            ..Default::default()
        })
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

#[async_trait]
impl VideoRenderer for FakeRenderer {
    async fn submit(&self, segments: &[RenderSegment]) -> Result<String, ProviderError> {
        if self.fail_submit {
            return Err(ProviderError::Http {
                status: 503,
                body: "renderer down".into(),
            });
        }
        self.submitted.lock().unwrap().push(segments.len());
        Ok("job-1".into())
    }

    async fn status(&self, _job_id: &str) -> Result<RenderStatus, ProviderError> {
        *self.status_calls.lock().unwrap() += 1;
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(serde_json::from_value(serde_json::json!({"status": "processing"})).unwrap())
        })
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Ok(vec![0u8; 16])
    }
}

/// Wan synthesizer with a scripted task status queue; an exhausted queue
/// answers `Pending`.
#[derive(Default)]
pub struct FakeWan {
    pub fail_submit: bool,
    pub requests: Mutex<Vec<WanRequest>>,
    pub statuses: Mutex<VecDeque<WanTaskStatus>>,
}

#[async_trait]
impl VideoSynthesizer for FakeWan {
    async fn submit(&self, request: &WanRequest) -> Result<String, ProviderError> {
        if self.fail_submit {
            return Err(ProviderError::GenerationFailed("quota exceeded".into()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("task-{}", requests.len()))
    }

    async fn task_status(&self, _task_id: &str) -> Result<WanTaskStatus, ProviderError> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(WanTaskStatus::Pending))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn media_service(store: &Arc<MemoryStore>, media: &Arc<FakeMedia>) -> Arc<MediaService> {
    Arc::new(MediaService::new(
        media.clone(),
        media.clone(),
        UsageRecorder::new(store.clone()),
    ))
}

pub fn events() -> Arc<EventBus> {
    Arc::new(EventBus::default())
}
