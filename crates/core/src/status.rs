//! String-backed lifecycle enums for every status column.
//!
//! Postgres stores these as `TEXT` with `CHECK` constraints listing the same
//! literals, so `as_str` output must stay in sync with the migrations.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Declare a `snake_case` string enum with `as_str`, `from_str`, and `ALL`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The literal persisted in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }

            /// Parse the database literal back into the enum.
            pub fn from_str(s: &str) -> Result<Self, CoreError> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        stringify!($name),
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Render state of a story's (or episode's) assembled video.
    VideoStatus {
        Idle => "idle",
        Generating => "generating",
        Completed => "completed",
        Failed => "failed",
    }
}

impl VideoStatus {
    /// `completed` and `failed` end a job; nothing polls past them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

string_enum! {
    /// Production label of an episode, advanced by explicit actions.
    EpisodeStatus {
        Draft => "draft",
        Scripted => "scripted",
        SegmentsReady => "segments_ready",
        VideoGenerating => "video_generating",
        VideoReady => "video_ready",
        Published => "published",
    }
}

string_enum! {
    SeriesStatus {
        Draft => "draft",
        InProduction => "in_production",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

string_enum! {
    /// Narrative role of a segment inside an episode.
    SegmentType {
        Intro => "intro",
        Main => "main",
        Recap => "recap",
        Cliffhanger => "cliffhanger",
        Credits => "credits",
    }
}

string_enum! {
    CharacterRole {
        Protagonist => "protagonist",
        Antagonist => "antagonist",
        Aliado => "aliado",
        Supporting => "supporting",
        Minor => "minor",
    }
}

impl CharacterRole {
    /// Lenient parse used for AI output: unknown roles become `Minor`.
    pub fn from_ai(s: &str) -> Self {
        Self::from_str(s.trim().to_lowercase().as_str()).unwrap_or(Self::Minor)
    }
}

string_enum! {
    /// Status of a poster (character or series) and of its generation rows.
    PosterStatus {
        Pending => "pending",
        Generating => "generating",
        Completed => "completed",
        Failed => "failed",
    }
}

string_enum! {
    /// Kind of AI call a usage fact was recorded for.
    GenerationType {
        Text => "text",
        Image => "image",
        Audio => "audio",
        Video => "video",
    }
}

string_enum! {
    /// Lifecycle of a `generations` activity row.
    GenerationRowStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
}

string_enum! {
    /// Lifecycle of a Wan story segment.
    WanSegmentStatus {
        Pending => "pending",
        AudioReady => "audio_ready",
        GeneratingVideo => "generating_video",
        VideoReady => "video_ready",
        Failed => "failed",
    }
}

impl WanSegmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::VideoReady | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn every_variant_round_trips_through_its_literal() {
        for status in EpisodeStatus::ALL {
            assert_eq!(EpisodeStatus::from_str(status.as_str()).unwrap(), *status);
        }
        for status in WanSegmentStatus::ALL {
            assert_eq!(WanSegmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn serde_name_matches_database_literal() {
        let json = serde_json::to_string(&EpisodeStatus::SegmentsReady).unwrap();
        assert_eq!(json, "\"segments_ready\"");
        let json = serde_json::to_string(&WanSegmentStatus::GeneratingVideo).unwrap();
        assert_eq!(json, "\"generating_video\"");
    }

    #[test]
    fn unknown_literal_is_a_validation_error() {
        let err = VideoStatus::from_str("rendering").unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("idle, generating"));
    }

    #[test]
    fn terminal_video_states() {
        assert!(VideoStatus::Completed.is_terminal());
        assert!(VideoStatus::Failed.is_terminal());
        assert!(!VideoStatus::Generating.is_terminal());
        assert!(!VideoStatus::Idle.is_terminal());
    }

    #[test]
    fn ai_roles_are_parsed_leniently() {
        assert_eq!(CharacterRole::from_ai(" Protagonist "), CharacterRole::Protagonist);
        assert_eq!(CharacterRole::from_ai("aliado"), CharacterRole::Aliado);
        assert_eq!(CharacterRole::from_ai("villain"), CharacterRole::Minor);
    }
}
