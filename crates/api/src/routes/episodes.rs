//! Route definitions for the `/episodes` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::episodes;
use crate::state::AppState;

/// Routes mounted at `/episodes`.
///
/// ```text
/// GET  /{id}               -> get_by_id
/// POST /{id}/segments      -> generate_segments
/// POST /{id}/continuity    -> generate_continuity
/// POST /{id}/images        -> generate_images
/// POST /{id}/audios        -> generate_audios
/// GET  /{id}/batches       -> batch_progress
/// POST /{id}/video         -> start_video
/// GET  /{id}/video         -> video_state
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(episodes::get_by_id))
        .route("/{id}/segments", post(episodes::generate_segments))
        .route("/{id}/continuity", post(episodes::generate_continuity))
        .route("/{id}/images", post(episodes::generate_images))
        .route("/{id}/audios", post(episodes::generate_audios))
        .route("/{id}/batches", get(episodes::batch_progress))
        .route(
            "/{id}/video",
            post(episodes::start_video).get(episodes::video_state),
        )
}
