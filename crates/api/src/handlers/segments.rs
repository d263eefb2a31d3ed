//! Per-segment actions: regenerate one asset, advance one Wan clip.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_db::models::segment::Segment;
use studio_db::repositories::{EpisodeRepo, SegmentRepo, SeriesRepo, StoryRepo};
use studio_pipeline::{AssetKind, SegmentParent};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

const FALLBACK_STYLE: &str = "cinematic";

#[derive(Debug, Default, Deserialize)]
pub struct RegenerateRequest {
    pub style: Option<String>,
}

async fn find_segment(state: &AppState, id: DbId) -> AppResult<Segment> {
    SegmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Segment", id }))
}

/// Episode segments belong to the episode even when a backing story exists.
fn parent_of(segment: &Segment) -> SegmentParent {
    match (segment.episode_id, segment.story_id) {
        (Some(episode_id), _) => SegmentParent::Episode(episode_id),
        (None, Some(story_id)) => SegmentParent::Story(story_id),
        (None, None) => SegmentParent::Story(segment.owner_id()),
    }
}

/// Visual style of the story, or of the series an episode belongs to.
async fn parent_style(state: &AppState, parent: SegmentParent) -> AppResult<String> {
    let style = match parent {
        SegmentParent::Story(id) => StoryRepo::find_by_id(&state.pool, id)
            .await?
            .map(|s| s.visual_style),
        SegmentParent::Episode(id) => match EpisodeRepo::find_by_id(&state.pool, id).await? {
            Some(episode) => SeriesRepo::find_by_id(&state.pool, episode.series_id)
                .await?
                .map(|s| s.visual_style),
            None => None,
        },
    };
    Ok(style.unwrap_or_else(|| FALLBACK_STYLE.to_string()))
}

async fn regenerate(
    state: AppState,
    id: DbId,
    kind: AssetKind,
    body: Option<Json<RegenerateRequest>>,
) -> AppResult<Json<DataResponse<Segment>>> {
    let segment = find_segment(&state, id).await?;
    let parent = parent_of(&segment);
    let style = match body.and_then(|Json(b)| b.style).filter(|s| !s.trim().is_empty()) {
        Some(style) => style,
        None => parent_style(&state, parent).await?,
    };

    let updated = state.batches.regenerate(parent, id, kind, &style).await?;
    Ok(Json(DataResponse::new(updated)))
}

/// POST /api/v1/segments/{id}/image/regenerate
pub async fn regenerate_image(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<RegenerateRequest>>,
) -> AppResult<Json<DataResponse<Segment>>> {
    regenerate(state, id, AssetKind::Image, body).await
}

/// POST /api/v1/segments/{id}/audio/regenerate
pub async fn regenerate_audio(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<RegenerateRequest>>,
) -> AppResult<Json<DataResponse<Segment>>> {
    regenerate(state, id, AssetKind::Audio, body).await
}

/// POST /api/v1/segments/{id}/clip
///
/// Runs the clip state machine once. A clip the tracker already follows is
/// returned as stored.
pub async fn process_clip(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Segment>>> {
    let segment = match state.clip_tracker.generate_segment(id).await? {
        Some(segment) => segment,
        None => find_segment(&state, id).await?,
    };
    Ok(Json(DataResponse::new(segment)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn segment(story_id: Option<DbId>, episode_id: Option<DbId>) -> Segment {
        Segment {
            id: 9,
            story_id,
            episode_id,
            segment_index: 0,
            segment_type: "main".into(),
            character_focus: None,
            text: String::new(),
            visual_prompt: String::new(),
            duration_seconds: 10,
            image_url: None,
            audio_url: None,
            video_url: None,
            video_status: "idle".into(),
            video_asset_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn episode_wins_over_backing_story() {
        assert_eq!(parent_of(&segment(Some(1), Some(2))), SegmentParent::Episode(2));
        assert_eq!(parent_of(&segment(Some(1), None)), SegmentParent::Story(1));
    }
}
