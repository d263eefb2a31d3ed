//! Route definitions for the `/stories` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::stories;
use crate::state::AppState;

/// Routes mounted at `/stories`.
///
/// ```text
/// GET    /                 -> list
/// POST   /                 -> generate
/// GET    /{id}             -> get_by_id
/// DELETE /{id}             -> delete
/// POST   /{id}/images      -> generate_images
/// POST   /{id}/audios      -> generate_audios
/// POST   /{id}/media       -> generate_media
/// GET    /{id}/batches     -> batch_progress
/// POST   /{id}/video       -> start_video
/// GET    /{id}/video       -> video_state
/// DELETE /{id}/video       -> stop_video
/// POST   /{id}/clips       -> generate_clips
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(stories::list).post(stories::generate))
        .route("/{id}", get(stories::get_by_id).delete(stories::delete))
        .route("/{id}/images", post(stories::generate_images))
        .route("/{id}/audios", post(stories::generate_audios))
        .route("/{id}/media", post(stories::generate_media))
        .route("/{id}/batches", get(stories::batch_progress))
        .route(
            "/{id}/video",
            post(stories::start_video)
                .get(stories::video_state)
                .delete(stories::stop_video),
        )
        .route("/{id}/clips", post(stories::generate_clips))
}
