//! Handlers for the `/stories` resource.
//!
//! A story is written by the chat model in one call; its segments then get
//! images and narration through background batches, and finally a render job
//! assembles the video.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use studio_core::error::CoreError;
use studio_core::status::VideoStatus;
use studio_core::types::DbId;
use studio_db::models::story::{Story, StoryWithSegments};
use studio_db::repositories::{SegmentRepo, StoryRepo};
use studio_pipeline::batch::BatchProgress;
use studio_pipeline::video_job::render_segments;
use studio_pipeline::wan::ClipBatchReport;
use studio_pipeline::{AssetKind, GenerateStory, SegmentParent, VideoJobState, VideoTarget};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateStoryRequest {
    #[validate(length(min = 1, max = 4000))]
    pub base_idea: String,
    #[validate(range(min = 1, max = 30))]
    pub segment_count: Option<u32>,
    pub visual_style: Option<String>,
    pub script_style: Option<String>,
}

/// Optional body of the batch endpoints; the story's own style is the default.
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoppedResponse {
    pub stopped: bool,
}

async fn find_story(state: &AppState, id: DbId) -> AppResult<Story> {
    StoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Story", id }))
}

fn batch_style(body: Option<Json<BatchRequest>>, story: &Story) -> String {
    body.and_then(|Json(b)| b.style)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| story.visual_style.clone())
}

/// GET /api/v1/stories
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Story>>>> {
    let stories = StoryRepo::list(&state.pool).await?;
    Ok(Json(DataResponse::new(stories)))
}

/// POST /api/v1/stories
///
/// Writes the story with the chat model and persists it with its segments.
pub async fn generate(
    State(state): State<AppState>,
    Json(mut input): Json<GenerateStoryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<StoryWithSegments>>)> {
    input.base_idea = input.base_idea.trim().to_string();
    input.validate()?;

    let story = state
        .stories
        .generate_story(GenerateStory {
            base_idea: input.base_idea,
            segment_count: input.segment_count,
            visual_style: input.visual_style,
            script_style: input.script_style,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(story))))
}

/// GET /api/v1/stories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<StoryWithSegments>>> {
    let story = find_story(&state, id).await?;
    let segments = SegmentRepo::list_for_story(&state.pool, id).await?;
    Ok(Json(DataResponse::new(StoryWithSegments { story, segments })))
}

/// DELETE /api/v1/stories/{id}
///
/// Stops any local render poll, removes stored assets, then the row.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    state.video_jobs.stop(VideoTarget::Story(id)).await;
    if state.stories.delete_story(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "Story", id }))
    }
}

// ---------------------------------------------------------------------------
// Media batches
// ---------------------------------------------------------------------------

async fn start_batches(
    state: &AppState,
    id: DbId,
    kinds: &[AssetKind],
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<BatchProgress>>>)> {
    let story = find_story(state, id).await?;
    let style = batch_style(body, &story);

    let mut started = Vec::with_capacity(kinds.len());
    for kind in kinds {
        started.push(
            state
                .batches
                .start(SegmentParent::Story(id), *kind, style.clone())
                .await?,
        );
    }
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new(started))))
}

/// POST /api/v1/stories/{id}/images
pub async fn generate_images(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<BatchProgress>>>)> {
    start_batches(&state, id, &[AssetKind::Image], body).await
}

/// POST /api/v1/stories/{id}/audios
pub async fn generate_audios(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<BatchProgress>>>)> {
    start_batches(&state, id, &[AssetKind::Audio], body).await
}

/// POST /api/v1/stories/{id}/media
///
/// Image and audio batches run concurrently; each stays sequential.
pub async fn generate_media(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<BatchProgress>>>)> {
    start_batches(&state, id, &[AssetKind::Image, AssetKind::Audio], body).await
}

/// GET /api/v1/stories/{id}/batches
pub async fn batch_progress(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BatchProgress>>>> {
    find_story(&state, id).await?;
    let progress = state.batches.progress(SegmentParent::Story(id)).await;
    Ok(Json(DataResponse::new(progress)))
}

// ---------------------------------------------------------------------------
// Render job
// ---------------------------------------------------------------------------

/// POST /api/v1/stories/{id}/video
///
/// Every segment needs an image and narration. `data` is `null` when the
/// story has no segments.
pub async fn start_video(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Option<VideoJobState>>>)> {
    find_story(&state, id).await?;
    let segments = SegmentRepo::list_for_story(&state.pool, id).await?;
    let payload = render_segments(id, &segments)?;

    let job = state
        .video_jobs
        .start(VideoTarget::Story(id), payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new(job))))
}

/// GET /api/v1/stories/{id}/video
///
/// Live poller state when this process tracks the job, otherwise the
/// persisted columns.
pub async fn video_state(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoJobState>>> {
    if let Some(live) = state.video_jobs.state(VideoTarget::Story(id)).await {
        return Ok(Json(DataResponse::new(live)));
    }

    let story = find_story(&state, id).await?;
    Ok(Json(DataResponse::new(persisted_video_state(
        Some(&story.video_status),
        story.video_job_id,
        story.video_url,
    ))))
}

/// Job state rebuilt from the render columns of a story or episode row.
pub(crate) fn persisted_video_state(
    status: Option<&str>,
    job_id: Option<String>,
    video_url: Option<String>,
) -> VideoJobState {
    let status = status
        .and_then(|s| VideoStatus::from_str(s).ok())
        .unwrap_or(VideoStatus::Idle);
    VideoJobState {
        status,
        progress: if status == VideoStatus::Completed { 100 } else { 0 },
        message: None,
        job_id,
        video_url,
        error: None,
    }
}

/// DELETE /api/v1/stories/{id}/video
///
/// Stops local polling only; the remote job keeps running.
pub async fn stop_video(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> Json<DataResponse<StoppedResponse>> {
    let stopped = state.video_jobs.stop(VideoTarget::Story(id)).await;
    Json(DataResponse::new(StoppedResponse { stopped }))
}

// ---------------------------------------------------------------------------
// Wan clips
// ---------------------------------------------------------------------------

/// POST /api/v1/stories/{id}/clips
///
/// Submits a clip for every segment without one in progress or done.
pub async fn generate_clips(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<ClipBatchReport>>)> {
    find_story(&state, id).await?;
    let segments = SegmentRepo::list_for_story(&state.pool, id).await?;
    let report = state.clip_tracker.generate_all(&segments).await;
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new(report))))
}
