//! Route definitions for Wan premise stories.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::wan;
use crate::state::AppState;

/// Routes mounted at `/wan`.
///
/// ```text
/// POST /stories                  -> generate_story
/// GET  /stories/{id}             -> get_story
/// POST /segments/{id}/process    -> process_segment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", post(wan::generate_story))
        .route("/stories/{id}", get(wan::get_story))
        .route("/segments/{id}/process", post(wan::process_segment))
}
