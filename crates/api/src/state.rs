use std::sync::Arc;

use studio_events::EventBus;
use studio_pipeline::{
    ActivityTracker, BatchGenerator, CharacterService, EpisodeService, MediaService, PgStore,
    SegmentVideoService, SeriesService, StoryService, UsageRecorder, VideoJobPoller,
    WanOrchestrator, WanStoryService, WanVideoTracker,
};
use studio_providers::{
    ClipCraftClient, DashScopeChatClient, DashScopeImageClient, DashScopeSpeechClient,
    ImageGenerator, ObjectStore, SpeechGenerator, SupabaseStorageClient, TextGenerator,
    VideoRenderer, VideoSynthesizer, WanClient,
};

use crate::batches::BatchRegistry;
use crate::config::{ProviderConfig, ServerConfig};

/// Provider clients, constructed once at startup.
#[derive(Clone)]
pub struct Providers {
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub speech: Arc<dyn SpeechGenerator>,
    pub video: Arc<dyn VideoSynthesizer>,
    pub renderer: Arc<dyn VideoRenderer>,
    pub storage: Arc<dyn ObjectStore>,
}

impl Providers {
    /// Build the HTTP clients. They share one connection pool.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let http = reqwest::Client::new();
        let key = config.dashscope_api_key.as_str();
        let base = config.dashscope_base_url.as_str();

        Self {
            text: Arc::new(DashScopeChatClient::with_client(
                http.clone(),
                config.dashscope_chat_url.as_str(),
                key,
            )),
            images: Arc::new(DashScopeImageClient::with_client(http.clone(), base, key)),
            speech: Arc::new(DashScopeSpeechClient::with_client(http.clone(), base, key)),
            video: Arc::new(WanClient::with_client(http.clone(), base, key)),
            renderer: Arc::new(ClipCraftClient::with_client(
                http.clone(),
                config.clipcraft_url.as_str(),
            )),
            storage: Arc::new(SupabaseStorageClient::with_client(
                http,
                config.storage_url.as_str(),
                config.storage_service_key.as_str(),
            )),
        }
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: studio_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus, streamed to clients on `/activity`.
    pub event_bus: Arc<EventBus>,
    pub usage: UsageRecorder,
    pub stories: Arc<StoryService>,
    pub episodes: Arc<EpisodeService>,
    pub series: Arc<SeriesService>,
    pub characters: CharacterService,
    pub wan_stories: Arc<WanStoryService>,
    pub wan_segments: Arc<WanOrchestrator>,
    /// Background tracker for clips on story/episode segments.
    pub clip_tracker: Arc<WanVideoTracker>,
    pub video_jobs: Arc<VideoJobPoller>,
    pub batches: Arc<BatchRegistry>,
}

impl AppState {
    /// Wire every service onto the pool, the providers and the event bus.
    pub fn new(
        pool: studio_db::DbPool,
        config: ServerConfig,
        providers: Providers,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        let buckets = config.providers.buckets.clone();
        let usage = UsageRecorder::new(store.clone());
        let activity = ActivityTracker::new(store.clone(), Arc::clone(&event_bus));
        let media = Arc::new(MediaService::new(
            Arc::clone(&providers.images),
            Arc::clone(&providers.speech),
            usage.clone(),
        ));
        let characters = CharacterService::new(pool.clone(), Arc::clone(&media));

        let stories = StoryService::new(
            pool.clone(),
            Arc::clone(&providers.text),
            Arc::clone(&providers.storage),
            buckets.clone(),
            usage.clone(),
            activity.clone(),
        );
        let episodes = EpisodeService::new(
            pool.clone(),
            Arc::clone(&providers.text),
            usage.clone(),
            activity,
        );
        let series = SeriesService::new(
            pool.clone(),
            Arc::clone(&providers.text),
            usage.clone(),
            characters.clone(),
        );
        let wan_stories = WanStoryService::new(pool.clone(), Arc::clone(&providers.text), usage.clone());
        let wan_segments = WanOrchestrator::new(
            store.clone(),
            Arc::clone(&providers.video),
            usage.clone(),
        );
        let clip_service = SegmentVideoService::new(
            store.clone(),
            Arc::clone(&providers.video),
            usage.clone(),
        );
        let clip_tracker = WanVideoTracker::new(Arc::new(clip_service), Arc::clone(&event_bus));
        let video_jobs = VideoJobPoller::new(
            Arc::clone(&providers.renderer),
            store.clone(),
            Arc::clone(&providers.storage),
            buckets.clone(),
            Arc::clone(&event_bus),
        );
        let generator = BatchGenerator::new(
            store,
            media,
            providers.storage,
            buckets,
            Arc::clone(&event_bus),
        );

        Self {
            pool,
            config: Arc::new(config),
            event_bus,
            usage,
            stories: Arc::new(stories),
            episodes: Arc::new(episodes),
            series: Arc::new(series),
            characters,
            wan_stories: Arc::new(wan_stories),
            wan_segments: Arc::new(wan_segments),
            clip_tracker: Arc::new(clip_tracker),
            video_jobs: Arc::new(video_jobs),
            batches: Arc::new(BatchRegistry::new(Arc::new(generator))),
        }
    }
}
