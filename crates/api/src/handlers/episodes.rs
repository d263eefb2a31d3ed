//! Handlers for the `/episodes` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_db::models::episode::{Episode, EpisodeWithSegments};
use studio_db::repositories::{EpisodeRepo, SegmentRepo, SeriesRepo};
use studio_pipeline::batch::BatchProgress;
use studio_pipeline::video_job::render_segments;
use studio_pipeline::{AssetKind, SegmentParent, VideoJobState, VideoTarget};

use crate::error::{AppError, AppResult};
use crate::handlers::stories::{persisted_video_state, BatchRequest};
use crate::response::DataResponse;
use crate::state::AppState;

async fn find_episode(state: &AppState, id: DbId) -> AppResult<Episode> {
    EpisodeRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Episode", id }))
}

/// GET /api/v1/episodes/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<EpisodeWithSegments>>> {
    let episode = find_episode(&state, id).await?;
    let segments = SegmentRepo::list_for_episode(&state.pool, id).await?;
    Ok(Json(DataResponse::new(EpisodeWithSegments { episode, segments })))
}

/// POST /api/v1/episodes/{id}/segments
pub async fn generate_segments(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<EpisodeWithSegments>>)> {
    let episode = state.episodes.generate_segments(id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(episode))))
}

/// POST /api/v1/episodes/{id}/continuity
///
/// Needs a previous episode in the same season; the first one is a 400.
pub async fn generate_continuity(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Episode>>> {
    let episode = state.episodes.generate_continuity(id).await?;
    Ok(Json(DataResponse::new(episode)))
}

async fn start_batch(
    state: &AppState,
    id: DbId,
    kind: AssetKind,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<BatchProgress>>)> {
    let episode = find_episode(state, id).await?;
    let style = match body.and_then(|Json(b)| b.style).filter(|s| !s.trim().is_empty()) {
        Some(style) => style,
        None => SeriesRepo::find_by_id(&state.pool, episode.series_id)
            .await?
            .map(|s| s.visual_style)
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Series",
                id: episode.series_id,
            }))?,
    };

    let progress = state
        .batches
        .start(SegmentParent::Episode(id), kind, style)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new(progress))))
}

/// POST /api/v1/episodes/{id}/images
pub async fn generate_images(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<BatchProgress>>)> {
    start_batch(&state, id, AssetKind::Image, body).await
}

/// POST /api/v1/episodes/{id}/audios
pub async fn generate_audios(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<BatchRequest>>,
) -> AppResult<(StatusCode, Json<DataResponse<BatchProgress>>)> {
    start_batch(&state, id, AssetKind::Audio, body).await
}

/// GET /api/v1/episodes/{id}/batches
pub async fn batch_progress(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<BatchProgress>>>> {
    find_episode(&state, id).await?;
    let progress = state.batches.progress(SegmentParent::Episode(id)).await;
    Ok(Json(DataResponse::new(progress)))
}

/// POST /api/v1/episodes/{id}/video
pub async fn start_video(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<(StatusCode, Json<DataResponse<Option<VideoJobState>>>)> {
    find_episode(&state, id).await?;
    let segments = SegmentRepo::list_for_episode(&state.pool, id).await?;
    let payload = render_segments(id, &segments)?;

    let job = state
        .video_jobs
        .start(VideoTarget::Episode(id), payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse::new(job))))
}

/// GET /api/v1/episodes/{id}/video
pub async fn video_state(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VideoJobState>>> {
    if let Some(live) = state.video_jobs.state(VideoTarget::Episode(id)).await {
        return Ok(Json(DataResponse::new(live)));
    }

    let episode = find_episode(&state, id).await?;
    Ok(Json(DataResponse::new(persisted_video_state(
        episode.video_status.as_deref(),
        episode.video_job_id,
        episode.video_url,
    ))))
}
