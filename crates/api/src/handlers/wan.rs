//! Wan premise stories and their clip segments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use studio_core::types::DbId;
use studio_db::models::wan_story::{WanStorySegment, WanStoryWithSegments};
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct WanStoryRequest {
    #[validate(length(min = 1, max = 4000))]
    pub premise: String,
    pub style: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub segment_count: Option<u32>,
}

/// POST /api/v1/wan/stories
pub async fn generate_story(
    State(state): State<AppState>,
    Json(mut input): Json<WanStoryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<WanStoryWithSegments>>)> {
    input.premise = input.premise.trim().to_string();
    input.validate()?;

    let story = state
        .wan_stories
        .generate_story_from_premise(&input.premise, input.style.as_deref(), input.segment_count)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(story))))
}

/// GET /api/v1/wan/stories/{id}
pub async fn get_story(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WanStoryWithSegments>>> {
    let story = state.wan_stories.get_story(id).await?;
    Ok(Json(DataResponse::new(story)))
}

/// POST /api/v1/wan/segments/{id}/process
///
/// Submits the clip if it was never submitted, otherwise checks on it once.
pub async fn process_segment(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WanStorySegment>>> {
    let segment = state.wan_segments.process_segment(id).await?;
    Ok(Json(DataResponse::new(segment)))
}
