//! Route definitions for the `/characters` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::characters;
use crate::state::AppState;

/// Routes mounted at `/characters`.
///
/// ```text
/// POST /{id}/poster   -> generate_poster
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/poster", post(characters::generate_poster))
}
