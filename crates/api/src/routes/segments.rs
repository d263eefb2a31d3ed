//! Route definitions for single segments.

use axum::routing::post;
use axum::Router;

use crate::handlers::segments;
use crate::state::AppState;

/// Routes mounted at `/segments`.
///
/// ```text
/// POST /{id}/image/regenerate   -> regenerate_image
/// POST /{id}/audio/regenerate   -> regenerate_audio
/// POST /{id}/clip               -> process_clip
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/image/regenerate", post(segments::regenerate_image))
        .route("/{id}/audio/regenerate", post(segments::regenerate_audio))
        .route("/{id}/clip", post(segments::process_clip))
}
