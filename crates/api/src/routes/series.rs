//! Route definitions for the `/series` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::series;
use crate::state::AppState;

/// Routes mounted at `/series`.
///
/// ```text
/// GET    /                                              -> list
/// POST   /                                              -> create
/// GET    /{id}                                          -> get_by_id
/// DELETE /{id}                                          -> delete
/// GET    /{id}/analytics                                -> analytics
/// GET    /{id}/characters                               -> list_characters
/// POST   /{id}/characters/migrate                       -> migrate_characters
/// POST   /{id}/poster                                   -> generate_poster
/// POST   /{id}/seasons/{season}/episodes                -> generate_episodes
/// GET    /{id}/seasons/{season}/next-episode            -> next_episode
/// GET    /{id}/seasons/{season}/episodes/{number}/exists -> episode_exists
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(series::list).post(series::create))
        .route("/{id}", get(series::get_by_id).delete(series::delete))
        .route("/{id}/analytics", get(series::analytics))
        .route("/{id}/characters", get(series::list_characters))
        .route("/{id}/characters/migrate", post(series::migrate_characters))
        .route("/{id}/poster", post(series::generate_poster))
        .route("/{id}/seasons/{season}/episodes", post(series::generate_episodes))
        .route("/{id}/seasons/{season}/next-episode", get(series::next_episode))
        .route(
            "/{id}/seasons/{season}/episodes/{number}/exists",
            get(series::episode_exists),
        )
}
