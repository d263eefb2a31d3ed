//! Handlers for the `/series` resource and its season planning.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use studio_core::analytics::SeriesAnalytics;
use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_db::models::character::Character;
use studio_db::models::episode::Episode;
use studio_db::models::series::Series;
use studio_db::repositories::{CharacterRepo, EpisodeRepo, SeriesRepo};
use studio_pipeline::series::CreatedSeries;
use studio_pipeline::CreateSeriesRequest;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSeriesBody {
    #[validate(length(min = 1, max = 4000))]
    pub base_concept: String,
    #[validate(range(min = 1, max = 10))]
    pub planned_seasons: Option<i32>,
    #[validate(range(min = 1, max = 30))]
    pub episodes_per_season: Option<i32>,
    pub visual_style: Option<String>,
    pub script_style: Option<String>,
    #[validate(range(min = 1))]
    pub target_duration_per_episode: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PosterRequest {
    pub custom_prompt: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeriesWithEpisodes {
    #[serde(flatten)]
    pub series: Series,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Serialize)]
pub struct NextEpisode {
    pub episode_number: i32,
}

#[derive(Debug, Serialize)]
pub struct EpisodeExists {
    pub exists: bool,
}

async fn find_series(state: &AppState, id: DbId) -> AppResult<Series> {
    SeriesRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Series", id }))
}

/// GET /api/v1/series
pub async fn list(State(state): State<AppState>) -> AppResult<Json<DataResponse<Vec<Series>>>> {
    let series = SeriesRepo::list(&state.pool).await?;
    Ok(Json(DataResponse::new(series)))
}

/// POST /api/v1/series
///
/// Writes the lore, saves the series with its cast and starts the posters
/// in the background.
pub async fn create(
    State(state): State<AppState>,
    Json(mut input): Json<CreateSeriesBody>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedSeries>>)> {
    input.base_concept = input.base_concept.trim().to_string();
    input.validate()?;

    let created = state
        .series
        .create_series(CreateSeriesRequest {
            base_concept: input.base_concept,
            planned_seasons: input.planned_seasons,
            episodes_per_season: input.episodes_per_season,
            visual_style: input.visual_style,
            script_style: input.script_style,
            target_duration_per_episode: input.target_duration_per_episode,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(created))))
}

/// GET /api/v1/series/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SeriesWithEpisodes>>> {
    let series = find_series(&state, id).await?;
    let episodes = EpisodeRepo::list_for_series(&state.pool, id, None).await?;
    Ok(Json(DataResponse::new(SeriesWithEpisodes { series, episodes })))
}

/// DELETE /api/v1/series/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if SeriesRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound { entity: "Series", id }))
    }
}

/// GET /api/v1/series/{id}/analytics
pub async fn analytics(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SeriesAnalytics>>> {
    let analytics = state.series.series_analytics(id).await?;
    Ok(Json(DataResponse::new(analytics)))
}

/// GET /api/v1/series/{id}/characters
pub async fn list_characters(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Character>>>> {
    find_series(&state, id).await?;
    let characters = CharacterRepo::list_for_series(&state.pool, id).await?;
    Ok(Json(DataResponse::new(characters)))
}

/// POST /api/v1/series/{id}/characters/migrate
///
/// Creates rows from the legacy `main_characters` blob; repeatable.
pub async fn migrate_characters(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Character>>>> {
    let created = state.characters.migrate_series_characters(id).await?;
    Ok(Json(DataResponse::new(created)))
}

/// POST /api/v1/series/{id}/poster
pub async fn generate_poster(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<PosterRequest>>,
) -> AppResult<Json<DataResponse<Series>>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let series = state
        .characters
        .generate_series_poster(id, request.custom_prompt.as_deref(), request.style.as_deref())
        .await?;
    Ok(Json(DataResponse::new(series)))
}

// ---------------------------------------------------------------------------
// Seasons
// ---------------------------------------------------------------------------

/// POST /api/v1/series/{id}/seasons/{season}/episodes
///
/// Plans the season's episodes; numbers already taken are skipped.
pub async fn generate_episodes(
    State(state): State<AppState>,
    Path((id, season)): Path<(DbId, i32)>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<Episode>>>)> {
    if season < 1 {
        return Err(AppError::BadRequest(format!("Invalid season number: {season}")));
    }
    let episodes = state.series.generate_episodes(id, season).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(episodes))))
}

/// GET /api/v1/series/{id}/seasons/{season}/next-episode
pub async fn next_episode(
    State(state): State<AppState>,
    Path((id, season)): Path<(DbId, i32)>,
) -> AppResult<Json<DataResponse<NextEpisode>>> {
    find_series(&state, id).await?;
    let episode_number = state.series.next_episode_number(id, season).await?;
    Ok(Json(DataResponse::new(NextEpisode { episode_number })))
}

/// GET /api/v1/series/{id}/seasons/{season}/episodes/{number}/exists
pub async fn episode_exists(
    State(state): State<AppState>,
    Path((id, season, number)): Path<(DbId, i32, i32)>,
) -> AppResult<Json<DataResponse<EpisodeExists>>> {
    let exists = state.series.episode_exists(id, season, number).await?;
    Ok(Json(DataResponse::new(EpisodeExists { exists })))
}
