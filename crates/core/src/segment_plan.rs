//! Segment counts and episode defaults.

/// Minimum number of segments in a standalone story.
pub const MIN_STORY_SEGMENTS: u32 = 3;

/// Minimum number of segments in an episode.
pub const MIN_EPISODE_SEGMENTS: u32 = 6;

/// Episode length when the episode does not specify one (seconds).
pub const DEFAULT_EPISODE_DURATION_SECS: i32 = 180;

/// Segment length when the model omits one (seconds).
pub const DEFAULT_SEGMENT_DURATION_SECS: i32 = 15;

/// Clip length requested from Wan (seconds).
pub const WAN_CLIP_DURATION_SECS: i32 = 15;

pub const DEFAULT_PLANNED_SEASONS: i32 = 1;
pub const DEFAULT_EPISODES_PER_SEASON: i32 = 6;

/// `max(3, round(duration / 10))`.
pub fn story_segment_target(duration: u32) -> u32 {
    let rounded = (f64::from(duration) / 10.0).round() as u32;
    rounded.max(MIN_STORY_SEGMENTS)
}

/// `max(6, ceil(target / 15))`, with a missing target treated as 180s.
pub fn episode_segment_target(target_duration: Option<i32>) -> u32 {
    let target = target_duration
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_EPISODE_DURATION_SECS);
    let per_segment = DEFAULT_SEGMENT_DURATION_SECS;
    let count = (target + per_segment - 1) / per_segment;
    (count as u32).max(MIN_EPISODE_SEGMENTS)
}

/// `(is_premiere, is_finale)` for an episode number within a season.
pub fn premiere_and_finale(episode_number: i32, episodes_per_season: i32) -> (bool, bool) {
    (episode_number == 1, episode_number == episodes_per_season)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_target_has_a_floor() {
        assert_eq!(story_segment_target(3), 3);
        assert_eq!(story_segment_target(0), 3);
        assert_eq!(story_segment_target(24), 3);
    }

    #[test]
    fn story_target_rounds() {
        assert_eq!(story_segment_target(45), 5);
        assert_eq!(story_segment_target(60), 6);
        assert_eq!(story_segment_target(64), 6);
    }

    #[test]
    fn episode_target_rounds_up() {
        assert_eq!(episode_segment_target(Some(180)), 12);
        assert_eq!(episode_segment_target(Some(181)), 13);
        assert_eq!(episode_segment_target(Some(300)), 20);
    }

    #[test]
    fn episode_target_has_a_floor() {
        assert_eq!(episode_segment_target(Some(30)), 6);
    }

    #[test]
    fn missing_episode_target_uses_default() {
        assert_eq!(episode_segment_target(None), 12);
        assert_eq!(episode_segment_target(Some(0)), 12);
    }

    #[test]
    fn premiere_and_finale_flags() {
        assert_eq!(premiere_and_finale(1, 6), (true, false));
        assert_eq!(premiere_and_finale(6, 6), (false, true));
        assert_eq!(premiere_and_finale(3, 6), (false, false));
        assert_eq!(premiere_and_finale(1, 1), (true, true));
    }
}
