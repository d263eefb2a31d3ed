//! Series production analytics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::status::EpisodeStatus;

/// The episode columns analytics reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeFacts {
    pub status: EpisodeStatus,
    pub actual_duration: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesAnalytics {
    pub total_episodes: i64,
    /// Episodes in `published` status.
    pub completed_episodes: i64,
    /// Sum of `actual_duration` over all episodes, in seconds.
    pub total_runtime: i64,
    /// `completed / total * 100`, 0 when there are no episodes.
    pub completion_percentage: f64,
    pub episodes_by_status: BTreeMap<String, i64>,
    /// `total_runtime / total_episodes`, 0 when there are no episodes.
    pub average_episode_duration: f64,
}

impl SeriesAnalytics {
    pub fn from_episodes(episodes: &[EpisodeFacts]) -> Self {
        let total = episodes.len() as i64;
        let mut analytics = Self {
            total_episodes: total,
            ..Default::default()
        };

        for episode in episodes {
            if episode.status == EpisodeStatus::Published {
                analytics.completed_episodes += 1;
            }
            analytics.total_runtime += i64::from(episode.actual_duration.unwrap_or(0));
            *analytics
                .episodes_by_status
                .entry(episode.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        if total > 0 {
            analytics.completion_percentage =
                analytics.completed_episodes as f64 / total as f64 * 100.0;
            analytics.average_episode_duration = analytics.total_runtime as f64 / total as f64;
        }

        analytics
    }
}

/// `max(existing) + 1`, or 1 for an empty season.
pub fn next_episode_number(existing: impl IntoIterator<Item = i32>) -> i32 {
    existing.into_iter().max().map_or(1, |max| max + 1)
}
