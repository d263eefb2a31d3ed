mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use studio_core::status::{VideoStatus, WanSegmentStatus};
use studio_core::storage::BucketNames;
use studio_db::models::token_usage::CreateTokenUsage;
use studio_events::{names, PlatformEvent};
use studio_pipeline::batch::{BatchProgress, SegmentError};
use studio_pipeline::store::{UsageStore, VideoTarget};
use studio_pipeline::wan::SUBMIT_FAILED_MESSAGE;
use studio_pipeline::{
    AssetKind, BatchGenerator, PipelineError, SegmentParent, SegmentVideoService, UsageRecorder,
    VideoJobPoller, WanOrchestrator, WanVideoTracker,
};
use studio_providers::{ProviderError, RenderStatus, WanTaskStatus};
use tokio::sync::{broadcast, watch};

fn render_status(value: serde_json::Value) -> Result<RenderStatus, ProviderError> {
    Ok(serde_json::from_value(value).unwrap())
}

/// Receive events until one named `event_type` arrives.
async fn wait_for(rx: &mut broadcast::Receiver<PlatformEvent>, event_type: &str) -> PlatformEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.event_type == event_type {
                return event;
            }
        }
    })
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Batch generation
// ---------------------------------------------------------------------------

fn batch(store: &Arc<MemoryStore>, storage: Arc<FakeStorage>) -> (BatchGenerator, Arc<FakeMedia>) {
    let media = Arc::new(FakeMedia::default());
    let generator = BatchGenerator::new(
        store.clone(),
        media_service(store, &media),
        storage,
        BucketNames::default(),
        events(),
    );
    (generator, media)
}

#[tokio::test]
async fn batch_skips_existing_assets_and_keeps_going_after_failures() {
    let mut done = segment(10, 1, 0);
    done.image_url = Some("https://storage/existing.png".into());
    let mut broken = segment(11, 1, 1);
    broken.visual_prompt = "boom".into();
    let fresh = segment(12, 1, 2);
    let store = MemoryStore::with_segments(vec![fresh, broken, done]);
    let storage = Arc::new(FakeStorage::default());
    let (generator, media) = batch(&store, storage.clone());
    let (tx, rx) = watch::channel(BatchProgress::idle(AssetKind::Image));

    let report = generator
        .generate_all(SegmentParent::Story(1), AssetKind::Image, "cinematic", &tx)
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 2);
    assert_eq!(report.fallbacks, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].segment_index, 1);

    // Existing asset untouched, provider called for the other two only.
    assert_eq!(store.segment(10).image_url.as_deref(), Some("https://storage/existing.png"));
    assert_eq!(media.calls.lock().unwrap().len(), 2);
    assert!(store.segment(11).image_url.is_none());

    let url = store.segment(12).image_url.unwrap();
    assert!(url.starts_with("https://storage/"), "{url}");
    assert!(url.contains("1/segment-2-"), "{url}");
    assert!(url.ends_with(".png"), "{url}");
    assert_eq!(storage.uploads.lock().unwrap().len(), 1);

    let progress = rx.borrow().clone();
    assert!(!progress.running);
    assert_eq!(progress.total, 3);
    assert_eq!(progress.completed, 2);
    assert_eq!(progress.errors, report.errors);

    let usage = store.usage.lock().unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].generation_type, "image");
    assert_eq!(usage[0].segment_id, Some(12));
    assert_eq!(usage[0].story_id, Some(1));
}

#[tokio::test]
async fn batch_keeps_provider_url_when_rehosting_fails() {
    let store = MemoryStore::with_segments(vec![segment(20, 2, 0)]);
    let storage = Arc::new(FakeStorage {
        fail_uploads: true,
        ..Default::default()
    });
    let (generator, _media) = batch(&store, storage);
    let (tx, _rx) = watch::channel(BatchProgress::idle(AssetKind::Audio));

    let report = generator
        .generate_all(SegmentParent::Story(2), AssetKind::Audio, "cinematic", &tx)
        .await
        .unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.fallbacks, 1);
    assert!(report.errors.is_empty());
    let url = store.segment(20).audio_url.unwrap();
    assert!(url.starts_with("https://provider/"), "{url}");
    assert!(url.ends_with(".mp3"), "{url}");
}

#[tokio::test]
async fn regenerate_replaces_asset_and_clears_error_entry() {
    let mut existing = segment(30, 3, 4);
    existing.image_url = Some("https://storage/old.png".into());
    let store = MemoryStore::with_segments(vec![existing]);
    let (generator, _media) = batch(&store, Arc::new(FakeStorage::default()));
    let (progress, _rx) = watch::channel(BatchProgress {
        errors: vec![
            SegmentError {
                segment_index: 4,
                message: "earlier failure".into(),
            },
            SegmentError {
                segment_index: 5,
                message: "other".into(),
            },
        ],
        ..BatchProgress::idle(AssetKind::Image)
    });

    let updated = generator
        .regenerate(30, AssetKind::Image, "anime", &progress)
        .await
        .unwrap();

    assert_ne!(updated.image_url.as_deref(), Some("https://storage/old.png"));
    let errors = progress.borrow().errors.clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].segment_index, 5);
}

#[tokio::test]
async fn regenerate_failure_is_recorded_and_returned() {
    let mut broken = segment(31, 3, 2);
    broken.text = "boom".into();
    let store = MemoryStore::with_segments(vec![broken]);
    let (generator, _media) = batch(&store, Arc::new(FakeStorage::default()));
    let (progress, _rx) = watch::channel(BatchProgress::idle(AssetKind::Audio));

    let result = generator
        .regenerate(31, AssetKind::Audio, "anime", &progress)
        .await;

    assert_matches!(result, Err(PipelineError::Provider(_)));
    let errors = progress.borrow().errors.clone();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].segment_index, 2);

    let missing = generator.regenerate(999, AssetKind::Audio, "anime", &progress).await;
    assert_matches!(missing, Err(PipelineError::NotFound { entity: "segment", id: 999 }));
}

// ---------------------------------------------------------------------------
// Render jobs
// ---------------------------------------------------------------------------

fn poller(
    store: &Arc<MemoryStore>,
    renderer: &Arc<FakeRenderer>,
    bus: &Arc<studio_events::EventBus>,
) -> Arc<VideoJobPoller> {
    Arc::new(VideoJobPoller::new(
        renderer.clone(),
        store.clone(),
        Arc::new(FakeStorage::default()),
        BucketNames::default(),
        bus.clone(),
    ))
}

#[tokio::test(start_paused = true)]
async fn empty_render_request_is_a_noop() {
    let store = Arc::new(MemoryStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let poller = poller(&store, &renderer, &events());

    let state = poller.start(VideoTarget::Story(1), Vec::new()).await.unwrap();

    assert!(state.is_none());
    assert!(renderer.submitted.lock().unwrap().is_empty());
    assert!(store.video_writes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn render_job_polls_until_completed_and_rehosts_video() {
    let store = Arc::new(MemoryStore::default());
    let renderer = FakeRenderer::scripted(vec![
        render_status(serde_json::json!({"status": "processing", "progress": 40})),
        render_status(serde_json::json!({
            "status": "completed",
            "output_url": "https://renderer/out.mp4",
        })),
    ]);
    let bus = events();
    let mut rx = bus.subscribe();
    let poller = poller(&store, &renderer, &bus);
    let target = VideoTarget::Story(1);

    let initial = poller
        .start(target, vec![render_segment(1), render_segment(2)])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initial.status, VideoStatus::Generating);
    assert_eq!(initial.job_id.as_deref(), Some("job-1"));
    assert_eq!(*renderer.submitted.lock().unwrap(), vec![2]);

    let first = store.video_writes.lock().unwrap()[0].clone();
    assert_eq!(first, (target, None, VideoStatus::Generating, Some("job-1".into())));

    let event = wait_for(&mut rx, names::VIDEO_COMPLETED).await;
    assert_eq!(event.source_entity_type.as_deref(), Some("story"));
    assert_eq!(event.source_entity_id, Some(1));

    let state = poller.state(target).await.unwrap();
    assert_eq!(state.status, VideoStatus::Completed);
    assert_eq!(state.progress, 100);
    assert_eq!(state.message.as_deref(), Some("Done!"));
    let url = state.video_url.clone().unwrap();
    assert!(url.contains("1/full-story-"), "{url}");
    assert!(url.ends_with(".mp4"), "{url}");

    let (written_target, written_url, status, job_id) = store.last_video_write().unwrap();
    assert_eq!(written_target, target);
    assert_eq!(written_url, Some(url));
    assert_eq!(status, VideoStatus::Completed);
    assert_eq!(job_id.as_deref(), Some("job-1"));

    // Terminal jobs are no longer polled.
    let polls = renderer.status_calls();
    assert_eq!(polls, 2);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(renderer.status_calls(), polls);
}

#[tokio::test(start_paused = true)]
async fn failed_render_without_message_uses_default_error() {
    let store = Arc::new(MemoryStore::default());
    let renderer = FakeRenderer::scripted(vec![render_status(serde_json::json!({"status": "failed"}))]);
    let bus = events();
    let mut rx = bus.subscribe();
    let poller = poller(&store, &renderer, &bus);
    let target = VideoTarget::Episode(7);

    poller.start(target, vec![render_segment(1)]).await.unwrap();
    wait_for(&mut rx, names::VIDEO_FAILED).await;

    let state = poller.state(target).await.unwrap();
    assert_eq!(state.status, VideoStatus::Failed);
    assert_eq!(state.error.as_deref(), Some("Video generation failed"));
    assert_matches!(
        store.last_video_write(),
        Some((VideoTarget::Episode(7), None, VideoStatus::Failed, Some(_)))
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(renderer.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn render_poll_errors_do_not_stop_the_job() {
    let store = Arc::new(MemoryStore::default());
    let renderer = FakeRenderer::scripted(vec![
        Err(ProviderError::Http {
            status: 502,
            body: "bad gateway".into(),
        }),
        render_status(serde_json::json!({
            "status": "completed",
            "output_url": "https://renderer/out.mp4",
        })),
    ]);
    let bus = events();
    let mut rx = bus.subscribe();
    let poller = poller(&store, &renderer, &bus);

    poller
        .start(VideoTarget::Story(3), vec![render_segment(1)])
        .await
        .unwrap();
    wait_for(&mut rx, names::VIDEO_COMPLETED).await;

    assert_eq!(renderer.status_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn render_submit_failure_marks_target_failed() {
    let store = Arc::new(MemoryStore::default());
    let renderer = Arc::new(FakeRenderer {
        fail_submit: true,
        ..Default::default()
    });
    let poller = poller(&store, &renderer, &events());
    let target = VideoTarget::Story(4);

    let result = poller.start(target, vec![render_segment(1)]).await;

    assert_matches!(result, Err(PipelineError::Provider(_)));
    assert_eq!(
        store.last_video_write(),
        Some((target, None, VideoStatus::Failed, None))
    );
    assert!(poller.state(target).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn unrecorded_render_job_marks_target_failed() {
    let store = Arc::new(MemoryStore {
        reject_video_status: Some(VideoStatus::Generating),
        ..Default::default()
    });
    let renderer = Arc::new(FakeRenderer::default());
    let bus = events();
    let mut rx = bus.subscribe();
    let poller = poller(&store, &renderer, &bus);
    let target = VideoTarget::Episode(9);

    let result = poller.start(target, vec![render_segment(1)]).await;

    assert_matches!(result, Err(PipelineError::Persistence(_)));
    assert_eq!(*renderer.submitted.lock().unwrap(), vec![1]);
    assert_eq!(
        store.last_video_write(),
        Some((target, None, VideoStatus::Failed, None))
    );
    assert!(poller.state(target).await.is_none());
    assert_eq!(renderer.status_calls(), 0);

    let event = wait_for(&mut rx, names::VIDEO_FAILED).await;
    assert_eq!(event.source_entity_type.as_deref(), Some("episode"));
}

#[tokio::test(start_paused = true)]
async fn stopped_job_is_no_longer_polled() {
    let store = Arc::new(MemoryStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let poller = poller(&store, &renderer, &events());
    let target = VideoTarget::Story(5);

    poller.start(target, vec![render_segment(1)]).await.unwrap();
    assert!(poller.stop(target).await);
    assert!(!poller.stop(target).await);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(renderer.status_calls(), 0);
    assert!(poller.state(target).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn resumed_job_polls_without_resubmitting() {
    let store = Arc::new(MemoryStore::default());
    let renderer = FakeRenderer::scripted(vec![render_status(serde_json::json!({
        "status": "completed",
        "output_url": "https://renderer/out.mp4",
    }))]);
    let bus = events();
    let mut rx = bus.subscribe();
    let poller = poller(&store, &renderer, &bus);

    let state = poller
        .resume(VideoTarget::Story(6), "job-old".into())
        .await;
    assert_eq!(state.job_id.as_deref(), Some("job-old"));

    wait_for(&mut rx, names::VIDEO_COMPLETED).await;
    assert!(renderer.submitted.lock().unwrap().is_empty());
    poller.shutdown().await;
}

// ---------------------------------------------------------------------------
// Wan clips
// ---------------------------------------------------------------------------

fn orchestrator(store: &Arc<MemoryStore>, wan: &Arc<FakeWan>) -> WanOrchestrator {
    WanOrchestrator::new(store.clone(), wan.clone(), UsageRecorder::new(store.clone()))
}

#[tokio::test]
async fn wan_segment_submits_then_completes() {
    let store = MemoryStore::with_wan_segments(vec![wan_segment(1)]);
    let wan = Arc::new(FakeWan::default());
    let orchestrator = orchestrator(&store, &wan);

    let submitted = orchestrator.process_segment(1).await.unwrap();
    assert_eq!(submitted.status, WanSegmentStatus::GeneratingVideo.as_str());
    assert_eq!(submitted.dashscope_task_id.as_deref(), Some("task-1"));
    {
        let requests = wan.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "Pasillo oscuro. Se abre la puerta");
        assert_eq!(requests[0].duration, 15);
    }

    // Still running: nothing changes.
    let pending = orchestrator.process_segment(1).await.unwrap();
    assert_eq!(pending.status, WanSegmentStatus::GeneratingVideo.as_str());

    wan.statuses.lock().unwrap().push_back(WanTaskStatus::Completed {
        video_url: "https://wan/clip.mp4".into(),
    });
    let ready = orchestrator.process_segment(1).await.unwrap();
    assert_eq!(ready.status, WanSegmentStatus::VideoReady.as_str());
    assert_eq!(ready.video_url.as_deref(), Some("https://wan/clip.mp4"));

    // Terminal rows are returned untouched.
    let again = orchestrator.process_segment(1).await.unwrap();
    assert_eq!(again.video_url, ready.video_url);
    assert_eq!(wan.requests.lock().unwrap().len(), 1);

    let usage = store.usage.lock().unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].generation_type, "video");
}

#[tokio::test]
async fn wan_submit_failure_stores_fixed_message() {
    let store = MemoryStore::with_wan_segments(vec![wan_segment(2)]);
    let wan = Arc::new(FakeWan {
        fail_submit: true,
        ..Default::default()
    });

    let row = orchestrator(&store, &wan).process_segment(2).await.unwrap();

    assert_eq!(row.status, WanSegmentStatus::Failed.as_str());
    assert_eq!(row.error_message.as_deref(), Some(SUBMIT_FAILED_MESSAGE));
    assert!(store.usage.lock().unwrap().is_empty());
}

#[tokio::test]
async fn wan_task_failure_keeps_provider_message() {
    let mut running = wan_segment(3);
    running.status = WanSegmentStatus::GeneratingVideo.as_str().into();
    running.dashscope_task_id = Some("task-9".into());
    let store = MemoryStore::with_wan_segments(vec![running]);
    let wan = Arc::new(FakeWan::default());
    wan.statuses.lock().unwrap().push_back(WanTaskStatus::Failed {
        message: "content moderation".into(),
    });

    let row = orchestrator(&store, &wan).process_segment(3).await.unwrap();

    assert_eq!(row.status, WanSegmentStatus::Failed.as_str());
    assert_eq!(row.error_message.as_deref(), Some("content moderation"));
    assert!(wan.requests.lock().unwrap().is_empty());
}

fn tracker(store: &Arc<MemoryStore>, wan: &Arc<FakeWan>) -> WanVideoTracker {
    let service = SegmentVideoService::new(store.clone(), wan.clone(), UsageRecorder::new(store.clone()));
    WanVideoTracker::new(Arc::new(service), events())
}

#[tokio::test(start_paused = true)]
async fn tracker_dedupes_and_settles_clips() {
    let mut seg = segment(40, 1, 0);
    seg.audio_url = Some("https://storage/a.mp3".into());
    let store = MemoryStore::with_segments(vec![seg]);
    let wan = Arc::new(FakeWan::default());
    let tracker = tracker(&store, &wan);

    let started = tracker.generate_segment(40).await.unwrap().unwrap();
    assert_eq!(started.video_status, "generating");
    assert_eq!(started.video_asset_id.as_deref(), Some("task-1"));
    assert!(tracker.is_tracking(40).await);
    {
        let requests = wan.requests.lock().unwrap();
        assert!(requests[0].prompt.starts_with("Visual: Escena 0"));
        assert_eq!(requests[0].audio_url.as_deref(), Some("https://storage/a.mp3"));
    }

    assert!(tracker.generate_segment(40).await.unwrap().is_none());

    tracker.tick().await;
    assert!(tracker.is_tracking(40).await);

    wan.statuses.lock().unwrap().push_back(WanTaskStatus::Completed {
        video_url: "https://wan/seg.mp4".into(),
    });
    tracker.tick().await;

    assert!(!tracker.is_tracking(40).await);
    let done = store.segment(40);
    assert_eq!(done.video_status, "completed");
    assert_eq!(done.video_url.as_deref(), Some("https://wan/seg.mp4"));
    assert_eq!(wan.requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn tracker_batch_skips_clips_in_progress_or_done() {
    let mut done = segment(50, 1, 0);
    done.video_status = "completed".into();
    done.video_url = Some("https://wan/old.mp4".into());
    let mut running = segment(51, 1, 1);
    running.video_status = "generating".into();
    running.video_asset_id = Some("task-x".into());
    let segments = vec![done, running, segment(52, 1, 2), segment(53, 1, 3)];
    let store = MemoryStore::with_segments(segments.clone());
    let wan = Arc::new(FakeWan::default());
    let tracker = tracker(&store, &wan);

    let report = tracker.generate_all(&segments).await;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.skipped, 2);
    assert!(report.errors.is_empty());
    assert!(tracker.is_tracking(52).await);
    assert!(tracker.is_tracking(53).await);
    assert!(!tracker.is_tracking(51).await);
}

#[tokio::test]
async fn clip_without_task_or_url_is_left_unchanged() {
    let mut stuck = segment(70, 1, 0);
    stuck.video_status = "generating".into();
    let mut no_url = segment(71, 1, 1);
    no_url.video_status = "completed".into();
    let store = MemoryStore::with_segments(vec![stuck, no_url]);
    let wan = Arc::new(FakeWan::default());
    let service = SegmentVideoService::new(store.clone(), wan.clone(), UsageRecorder::new(store.clone()));

    let first = service.process_segment(70).await.unwrap();
    let second = service.process_segment(71).await.unwrap();

    assert_eq!(first.video_status, "generating");
    assert!(first.video_asset_id.is_none());
    assert_eq!(second.video_status, "completed");
    assert!(second.video_url.is_none());
    assert!(wan.requests.lock().unwrap().is_empty());
    assert!(store.usage.lock().unwrap().is_empty());

    let tracker = tracker(&store, &wan);
    tracker.generate_segment(70).await.unwrap();
    assert!(!tracker.is_tracking(70).await);
}

#[tokio::test]
async fn segment_clip_submit_failure_marks_segment_failed() {
    let store = MemoryStore::with_segments(vec![segment(60, 1, 0)]);
    let wan = Arc::new(FakeWan {
        fail_submit: true,
        ..Default::default()
    });
    let tracker = tracker(&store, &wan);

    let result = tracker.generate_segment(60).await;

    assert_matches!(result, Err(PipelineError::Provider(_)));
    assert!(!tracker.is_tracking(60).await);
    let failed = store.segment(60);
    assert_eq!(failed.video_status, "failed");
    assert!(failed.video_asset_id.is_none());
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn series_usage_counts_each_row_once() {
    let store = Arc::new(MemoryStore::default());
    let rows = [
        (Some(1), None, 100),
        (Some(1), Some(10), 200),
        (None, Some(10), 300),
        (Some(2), None, 1000),
    ];
    for (series_id, episode_id, tokens) in rows {
        store
            .insert_usage(&CreateTokenUsage {
                generation_type: "text".into(),
                model_used: "qwen-plus".into(),
                provider: "dashscope".into(),
                prompt_tokens: tokens / 2,
                completion_tokens: tokens / 2,
                total_tokens: tokens,
                context_type: Some("series_lore".into()),
                series_id,
                episode_id,
                ..Default::default()
            })
            .await
            .unwrap();
    }
    let recorder = UsageRecorder::new(store.clone());

    let summary = recorder.usage_by_series(1).await.unwrap();

    assert_eq!(summary.total_generations, 3);
    assert_eq!(summary.total_tokens, 600);
    assert_eq!(summary.text_generations, 3);
    assert_eq!(summary.by_model["qwen-plus"].count, 3);
}
