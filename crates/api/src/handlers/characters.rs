//! Handlers for the `/characters` resource.

use axum::extract::{Path, State};
use axum::Json;
use studio_core::types::DbId;
use studio_db::models::character::Character;

use crate::error::AppResult;
use crate::handlers::series::PosterRequest;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/characters/{id}/poster
///
/// Generates a poster, records the attempt and selects it on the character.
pub async fn generate_poster(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<PosterRequest>>,
) -> AppResult<Json<DataResponse<Character>>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let character = state
        .characters
        .generate_character_poster(id, request.custom_prompt.as_deref(), request.style.as_deref())
        .await?;
    Ok(Json(DataResponse::new(character)))
}
