//! Visual and script style catalog.
//!
//! Styles arrive from callers either as a kebab-case key
//! (`"cinematic-realistic"`) or as a display label (`"Cinematic Realistic"`).
//! Both forms resolve to the same entry; prompts embed the label and the
//! long-form description.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Visual styles
// ---------------------------------------------------------------------------

/// One entry of a style catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleMetadata {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// Rendering style applied to image and video prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualStyle {
    ComicBook,
    CreepyComic,
    CinematicRealistic,
    Anime,
    OilPainting,
    ThreeDRender,
    Watercolor,
    Cyberpunk,
    Steampunk,
    Gothic,
    ScaryCartoon,
    PixarLike,
}

impl VisualStyle {
    pub const ALL: [VisualStyle; 12] = [
        Self::ComicBook,
        Self::CreepyComic,
        Self::CinematicRealistic,
        Self::Anime,
        Self::OilPainting,
        Self::ThreeDRender,
        Self::Watercolor,
        Self::Cyberpunk,
        Self::Steampunk,
        Self::Gothic,
        Self::ScaryCartoon,
        Self::PixarLike,
    ];

    pub fn metadata(&self) -> StyleMetadata {
        let (key, label, description) = match self {
            Self::ComicBook => (
                "comic-book",
                "Comic Book",
                "Bold comic book panel with thick black ink outlines, halftone dot shading, and vibrant saturated colors",
            ),
            Self::CreepyComic => (
                "creepy-comic",
                "Creepy Comic",
                "Creepy indie comic illustration with wobbly hand-drawn ink lines and muted sickly colors",
            ),
            Self::CinematicRealistic => (
                "cinematic-realistic",
                "Cinematic Realistic",
                "Cinematic photorealistic scene with volumetric fog and dramatic directional lighting",
            ),
            Self::Anime => (
                "anime",
                "Anime",
                "Anime illustration with large expressive eyes, vibrant cel-shaded colors, and dynamic poses",
            ),
            Self::OilPainting => (
                "oil-painting",
                "Oil Painting",
                "Classical oil painting with visible thick brushstrokes, rich deep colors, and dramatic chiaroscuro lighting",
            ),
            Self::ThreeDRender => (
                "3d-render",
                "3D Render",
                "Stylized 3D render with ray-traced reflections and perfect studio lighting",
            ),
            Self::Watercolor => (
                "watercolor",
                "Watercolor",
                "Watercolor painting with soft bleeding color edges and translucent washes of pastel colors",
            ),
            Self::Cyberpunk => (
                "cyberpunk",
                "Cyberpunk",
                "Cyberpunk city street with neon signs, rain-slicked ground, and holographic advertisements",
            ),
            Self::Steampunk => (
                "steampunk",
                "Steampunk",
                "Steampunk mechanical scene with exposed gears, copper pipes, and Victorian era industrial aesthetic",
            ),
            Self::Gothic => (
                "gothic",
                "Gothic",
                "Dark gothic illustration with deep black and grey palette and medieval horror style",
            ),
            Self::ScaryCartoon => (
                "scary-cartoon",
                "Scary Cartoon",
                "Illustrated comic book style with dramatic cinematic lighting and semi-realistic proportions",
            ),
            Self::PixarLike => (
                "pixar-like",
                "Pixar Like",
                "Pixar-style 3D animation with cute characters, rounded features, and Disney quality rendering",
            ),
        };
        StyleMetadata {
            key,
            label,
            description,
        }
    }

    /// Resolve a key or a display label. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| {
            let meta = style.metadata();
            meta.key == value || meta.label == value
        })
    }

    pub fn key(&self) -> &'static str {
        self.metadata().key
    }
}

impl Default for VisualStyle {
    fn default() -> Self {
        Self::CinematicRealistic
    }
}

/// Description appended to image prompts for `style`.
///
/// Unknown styles (free text such as a series' `"cinematic"`) are passed
/// through verbatim so the provider still sees the caller's intent.
pub fn describe_visual_style(style: &str) -> String {
    match VisualStyle::parse(style) {
        Some(known) => known.metadata().description.to_string(),
        None => style.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Script styles
// ---------------------------------------------------------------------------

/// Narrative tone used when writing narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptStyle {
    ScaryHorror,
    FunnyComedy,
    EducationalDocumentary,
    DramaticTelenovela,
    InspirationalMotivational,
    ActionThriller,
}

impl ScriptStyle {
    pub const ALL: [ScriptStyle; 6] = [
        Self::ScaryHorror,
        Self::FunnyComedy,
        Self::EducationalDocumentary,
        Self::DramaticTelenovela,
        Self::InspirationalMotivational,
        Self::ActionThriller,
    ];

    pub fn metadata(&self) -> StyleMetadata {
        let (key, label, description) = match self {
            Self::ScaryHorror => (
                "scary-horror",
                "Scary/Horror",
                "Cinematic horror atmosphere with dark haunted scenes, shadowy figures, and ominous mood",
            ),
            Self::FunnyComedy => (
                "funny-comedy",
                "Funny/Comedy",
                "Bright colorful scenes with exaggerated expressions, fun and joyful atmosphere",
            ),
            Self::EducationalDocumentary => (
                "educational-documentary",
                "Educational/Documentary",
                "Professional documentary style with warm lighting and intellectual vibe",
            ),
            Self::DramaticTelenovela => (
                "dramatic-telenovela",
                "Dramatic/Telenovela",
                "Dramatic soap opera aesthetic with intense emotions and high contrast",
            ),
            Self::InspirationalMotivational => (
                "inspirational-motivational",
                "Inspirational/Motivational",
                "Inspirational scenes with uplifting atmosphere and breathtaking views",
            ),
            Self::ActionThriller => (
                "action-thriller",
                "Action/Thriller",
                "High octane action scenes with motion blur, explosions, and intense energy",
            ),
        };
        StyleMetadata {
            key,
            label,
            description,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| {
            let meta = style.metadata();
            meta.key == value || meta.label == value
        })
    }

    pub fn key(&self) -> &'static str {
        self.metadata().key
    }
}

impl Default for ScriptStyle {
    fn default() -> Self {
        Self::DramaticTelenovela
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_key_and_label() {
        assert_eq!(VisualStyle::parse("3d-render"), Some(VisualStyle::ThreeDRender));
        assert_eq!(VisualStyle::parse("3D Render"), Some(VisualStyle::ThreeDRender));
        assert_eq!(
            ScriptStyle::parse("Dramatic/Telenovela"),
            Some(ScriptStyle::DramaticTelenovela)
        );
        assert_eq!(ScriptStyle::parse("action-thriller"), Some(ScriptStyle::ActionThriller));
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert_eq!(VisualStyle::parse("cinematic"), None);
        assert_eq!(ScriptStyle::parse("dramatic"), None);
    }

    #[test]
    fn catalog_keys_are_unique() {
        let mut keys: Vec<_> = VisualStyle::ALL.iter().map(|s| s.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 12);

        let mut keys: Vec<_> = ScriptStyle::ALL.iter().map(|s| s.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn describe_falls_back_to_raw_input() {
        assert!(describe_visual_style("anime").starts_with("Anime illustration"));
        assert_eq!(describe_visual_style("cinematic"), "cinematic");
    }

    #[test]
    fn defaults() {
        assert_eq!(VisualStyle::default().key(), "cinematic-realistic");
        assert_eq!(ScriptStyle::default().key(), "dramatic-telenovela");
    }
}
