pub mod characters;
pub mod episodes;
pub mod health;
pub mod segments;
pub mod series;
pub mod stories;
pub mod usage;
pub mod wan;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /activity                                        SSE activity feed
///
/// /stories                                         list, generate
/// /stories/{id}                                    get, delete
/// /stories/{id}/images|audios|media                start media batches
/// /stories/{id}/batches                            batch progress
/// /stories/{id}/video                              start, state, stop render
/// /stories/{id}/clips                              submit Wan clips
///
/// /segments/{id}/image/regenerate                  regenerate one image
/// /segments/{id}/audio/regenerate                  regenerate one narration
/// /segments/{id}/clip                              advance one clip
///
/// /series                                          list, create
/// /series/{id}                                     get, delete
/// /series/{id}/analytics                           usage and progress rollup
/// /series/{id}/characters                          list cast
/// /series/{id}/characters/migrate                  rows from legacy JSON
/// /series/{id}/poster                              series poster
/// /series/{id}/seasons/{season}/...                plan episodes, numbering
///
/// /episodes/{id}                                   get with segments
/// /episodes/{id}/segments|continuity               script generation
/// /episodes/{id}/images|audios|batches|video       media and render
///
/// /characters/{id}/poster                          character poster
///
/// /usage/{scope}/{id}                              usage summary
/// /usage/series/{id}/seasons/{season}              per-season usage
///
/// /wan/stories                                     generate from premise
/// /wan/stories/{id}                                get with segments
/// /wan/segments/{id}/process                       advance one clip
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Server-sent activity feed.
        .route("/activity", get(handlers::activity::stream))
        // Narrated stories: script, media batches, render.
        .nest("/stories", stories::router())
        .nest("/segments", segments::router())
        // Series, seasons and their cast.
        .nest("/series", series::router())
        .nest("/episodes", episodes::router())
        .nest("/characters", characters::router())
        .nest("/usage", usage::router())
        // Premise-driven Wan clip stories.
        .nest("/wan", wan::router())
}
