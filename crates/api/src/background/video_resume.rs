//! Re-attach render polls that were running when the process last stopped.
//!
//! A story or episode left in `generating` with a stored job id still has a
//! live render job; polling resumes without resubmitting.

use std::sync::Arc;

use studio_db::repositories::{EpisodeRepo, StoryRepo};
use studio_db::DbPool;
use studio_pipeline::{VideoJobPoller, VideoTarget};

/// Resume every unfinished render. Returns how many polls were attached.
pub async fn run(pool: &DbPool, poller: &Arc<VideoJobPoller>) -> Result<usize, sqlx::Error> {
    let mut resumed = 0;

    for story in StoryRepo::list_generating_videos(pool).await? {
        if let Some(job_id) = story.video_job_id {
            poller.resume(VideoTarget::Story(story.id), job_id).await;
            resumed += 1;
        }
    }

    for episode in EpisodeRepo::list_generating_videos(pool).await? {
        if let Some(job_id) = episode.video_job_id {
            poller.resume(VideoTarget::Episode(episode.id), job_id).await;
            resumed += 1;
        }
    }

    if resumed > 0 {
        tracing::info!(resumed, "Resumed render polls");
    } else {
        tracing::debug!("No render polls to resume");
    }
    Ok(resumed)
}
