//! Route definitions for usage summaries.

use axum::routing::get;
use axum::Router;

use crate::handlers::usage;
use crate::state::AppState;

/// Routes mounted at `/usage`.
///
/// ```text
/// GET /series/{id}/seasons/{season}   -> season_summary
/// GET /{scope}/{id}                   -> summary
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/series/{id}/seasons/{season}", get(usage::season_summary))
        .route("/{scope}/{id}", get(usage::summary))
}
