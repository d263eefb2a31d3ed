//! Token and generation usage summaries.

use axum::extract::{Path, State};
use axum::Json;
use studio_core::types::DbId;
use studio_core::usage::UsageSummary;
use studio_pipeline::UsageScope;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/usage/{scope}/{id}
///
/// `scope` is one of `story`, `episode`, `segment`, `series`, `character`.
/// Series totals include every episode's rows, each counted once.
pub async fn summary(
    State(state): State<AppState>,
    Path((scope, id)): Path<(UsageScope, DbId)>,
) -> AppResult<Json<DataResponse<UsageSummary>>> {
    let summary = state.usage.summary(scope, id).await?;
    Ok(Json(DataResponse::new(summary)))
}

/// GET /api/v1/usage/series/{id}/seasons/{season}
pub async fn season_summary(
    State(state): State<AppState>,
    Path((series_id, season)): Path<(DbId, i32)>,
) -> AppResult<Json<DataResponse<UsageSummary>>> {
    let summary = state.usage.usage_by_season(series_id, season).await?;
    Ok(Json(DataResponse::new(summary)))
}
