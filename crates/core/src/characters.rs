//! Character heuristics: palettes, importance, keywords and image prompts.
//!
//! Everything here is deterministic string work over AI-generated character
//! sheets, so a character can be created (and its poster requested) without
//! a second model call.

use std::sync::LazyLock;

use regex::Regex;

use crate::status::CharacterRole;

static LONG_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{4,}\b").expect("valid regex"));
static FEATURE_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w{3,}\b").expect("valid regex"));
static HAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:cabello|pelo)\s+\w+\s+\w+").expect("valid regex"));
static EYES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ojos\s+\w+(?:\s+\w+)?").expect("valid regex"));
static SKIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"piel\s+\w+").expect("valid regex"));
static ROPA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ropa\s+[\w\s]{5,50}").expect("valid regex"));
static VISTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"viste\s+[\w\s]{5,50}").expect("valid regex"));

/// Cap on keywords stored for a generated character.
pub const MAX_VISUAL_KEYWORDS: usize = 15;

/// Cap on keywords when migrating legacy characters (description only).
pub const MAX_LEGACY_KEYWORDS: usize = 10;

/// Feature list used when the model returned none.
pub const DEFAULT_FEATURE: &str = "No specific features defined";

/// Feature list used when a legacy character had no traits.
pub const DEFAULT_LEGACY_FEATURE: &str = "No distinctive features defined";

// ---------------------------------------------------------------------------
// Role-derived attributes
// ---------------------------------------------------------------------------

/// Four hex colors used for the character card, keyed by role.
pub fn color_palette(role: CharacterRole) -> [&'static str; 4] {
    match role {
        CharacterRole::Protagonist => ["#3b82f6", "#60a5fa", "#1e40af", "#dbeafe"],
        CharacterRole::Antagonist => ["#ef4444", "#f87171", "#991b1b", "#fee2e2"],
        CharacterRole::Aliado => ["#10b981", "#34d399", "#065f46", "#d1fae5"],
        CharacterRole::Supporting => ["#6b7280", "#9ca3af", "#374151", "#f3f4f6"],
        CharacterRole::Minor => ["#9ca3af", "#d1d5db", "#4b5563", "#f9fafb"],
    }
}

/// Sort weight for character lists (higher first).
pub fn importance_level(role: CharacterRole) -> i32 {
    match role {
        CharacterRole::Protagonist => 10,
        CharacterRole::Antagonist => 9,
        CharacterRole::Aliado => 7,
        _ => 5,
    }
}

/// Importance used for migrated legacy characters, which never had allies.
pub fn legacy_importance_level(role: CharacterRole) -> i32 {
    match role {
        CharacterRole::Protagonist => 10,
        CharacterRole::Antagonist => 9,
        _ => 5,
    }
}

/// Protagonists and antagonists get a poster as soon as they are created.
pub fn wants_auto_poster(role: CharacterRole) -> bool {
    matches!(role, CharacterRole::Protagonist | CharacterRole::Antagonist)
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// Lower-cased keywords: 4+ character words of the description followed by
/// 3+ character words of each feature, de-duplicated in first-seen order and
/// capped at [`MAX_VISUAL_KEYWORDS`].
pub fn extract_visual_keywords(description: &str, features: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |word: &str| {
        if !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    };

    let description = description.to_lowercase();
    for m in LONG_WORD_RE.find_iter(&description) {
        push(m.as_str());
    }
    for feature in features {
        let feature = feature.to_lowercase();
        for m in FEATURE_WORD_RE.find_iter(&feature) {
            push(m.as_str());
        }
    }

    keywords.truncate(MAX_VISUAL_KEYWORDS);
    keywords
}

/// Description-only variant used by the legacy character migration.
pub fn extract_legacy_keywords(description: &str) -> Vec<String> {
    let mut keywords = extract_visual_keywords(description, &[]);
    keywords.truncate(MAX_LEGACY_KEYWORDS);
    keywords
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Minimal character data needed to describe a portrait.
#[derive(Debug, Clone, Copy)]
pub struct CharacterSketch<'a> {
    pub name: &'a str,
    pub role: CharacterRole,
    pub description: &'a str,
    pub distinctive_features: &'a [String],
}

/// Series attributes that shape a portrait.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesLook<'a> {
    pub visual_style: Option<&'a str>,
    pub setting: Option<&'a str>,
}

/// Fallback visual prompt stored when a character is created without one.
pub fn default_visual_prompt(role: CharacterRole) -> String {
    format!(
        "Cinematic character portrait. Role: {role}. Highly detailed, realistic lighting, \
         professional photography, dramatic mood."
    )
}

/// Spanish portrait prompt assembled from the character sheet alone.
///
/// Physical traits (hair, eyes, skin, clothing) are lifted from the
/// description when it mentions them, otherwise neutral defaults are used.
pub fn build_detailed_visual_prompt(character: &CharacterSketch<'_>, series: &SeriesLook<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let lower = character.description.to_lowercase();

    parts.push(format!(
        "Retrato cinematográfico profesional de {}.",
        character.name
    ));
    parts.push(format!("{}.", role_lighting(character.role)));
    parts.push(format!("Edad: {}.", age_estimate(&lower)));

    let hair = if lower.contains("cabello") || lower.contains("pelo") {
        first_match(&HAIR_RE, &lower).unwrap_or("cabello oscuro estilizado")
    } else {
        "cabello oscuro natural"
    };
    let eyes = if lower.contains("ojos") {
        first_match(&EYES_RE, &lower).unwrap_or("ojos oscuros expresivos")
    } else {
        "ojos oscuros intensos"
    };
    let skin = if lower.contains("piel") {
        first_match(&SKIN_RE, &lower).unwrap_or("piel morena")
    } else {
        "piel morena clara"
    };
    parts.push(format!("{hair}, {eyes}, {skin}."));

    if !character.distinctive_features.is_empty() {
        let features: Vec<&str> = character
            .distinctive_features
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        parts.push(format!("Características únicas: {}.", features.join(", ")));
    }

    if lower.contains("ropa") || lower.contains("viste") || lower.contains("clothing") {
        let clothing = first_match(&ROPA_RE, &lower).or_else(|| first_match(&VISTE_RE, &lower));
        if let Some(clothing) = clothing {
            parts.push(format!("Vestimenta: {}.", clothing.trim_end()));
        }
    } else {
        let setting = series.setting.unwrap_or_default().to_lowercase();
        if setting.contains("ciberpunk") || setting.contains("futur") {
            parts.push("Vestimenta urbana futurista con detalles tecnológicos.".to_string());
        } else {
            parts.push("Vestimenta contemporánea apropiada al contexto.".to_string());
        }
    }

    parts.push(format!(
        "Contexto: {}...",
        truncate_chars(character.description, 150)
    ));

    if let Some(setting) = series.setting.filter(|s| !s.is_empty()) {
        parts.push(format!("Ambientación: {}...", truncate_chars(setting, 100)));
    }

    let style = series
        .visual_style
        .filter(|s| !s.is_empty())
        .unwrap_or("cinematic-realistic");
    parts.push(format!("Estilo visual: {style}."));

    parts.push(
        "Composición profesional de retrato, enfoque nítido, profundidad de campo \
         cinematográfica, iluminación dramática de tres puntos, colores ricos y saturados, \
         alta resolución, ultra detallado, fotorrealista."
            .to_string(),
    );

    parts.join(" ")
}

/// Poster prompt for a character, pinned to the series' visual style.
pub fn character_poster_prompt(
    character: &CharacterSketch<'_>,
    series_title: &str,
    setting: Option<&str>,
    visual_style: &str,
) -> String {
    let features = character.distinctive_features.join(", ");
    let setting = match setting.filter(|s| !s.is_empty()) {
        Some(s) => format!("Setting: {s}."),
        None => String::new(),
    };
    format!(
        "Character portrait for \"{series_title}\". {}, {}. {}. Distinctive features: {features}. \
         {setting} IMPORTANT: Generate in {visual_style} visual style. The character MUST match \
         the {visual_style} aesthetic of the series. High quality, detailed, dramatic lighting, \
         cinematic composition.",
        character.name, character.role, character.description,
    )
}

/// Fields of a series used by its poster prompt.
#[derive(Debug, Clone, Copy)]
pub struct SeriesPosterInput<'a> {
    pub title: &'a str,
    pub tagline: Option<&'a str>,
    pub base_concept: &'a str,
    pub full_lore: &'a str,
    pub setting: Option<&'a str>,
    pub genre: &'a [String],
    pub themes: &'a [String],
    pub visual_style: &'a str,
}

pub fn series_poster_prompt(series: &SeriesPosterInput<'_>) -> String {
    let hook = series
        .tagline
        .filter(|t| !t.is_empty())
        .unwrap_or(series.base_concept);
    format!(
        "Movie poster for \"{}\" - {hook}. {}. Setting: {}. Genre: {}. Themes: {}. \
         Visual style: {}. Cinematic, dramatic, high-quality poster design with title treatment.",
        series.title,
        truncate_chars(series.full_lore, 300),
        series.setting.unwrap_or_default(),
        series.genre.join(", "),
        series.themes.join(", "),
        series.visual_style,
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn role_lighting(role: CharacterRole) -> &'static str {
    match role {
        CharacterRole::Protagonist => {
            "Iluminación heroica con luz principal fuerte, expresión determinada y confiada"
        }
        CharacterRole::Antagonist => {
            "Iluminación dramática con sombras marcadas, presencia intimidante y misteriosa"
        }
        CharacterRole::Aliado => "Iluminación cálida y amigable, expresión leal y confiable",
        CharacterRole::Supporting => "Iluminación equilibrada, expresión natural y accesible",
        CharacterRole::Minor => "Iluminación estándar, presencia casual",
    }
}

fn age_estimate(lower_description: &str) -> &'static str {
    let has = |words: &[&str]| words.iter().any(|w| lower_description.contains(w));
    if has(&["diecinueve", "adolescent", "teen"]) {
        "adolescente tardío"
    } else if has(&["setenta", "anciano", "elderly"]) {
        "adulto mayor"
    } else if has(&["cuarenta", "cincuenta", "middle"]) {
        "mediana edad"
    } else {
        "adulto joven"
    }
}

fn first_match<'h>(re: &Regex, haystack: &'h str) -> Option<&'h str> {
    re.find(haystack).map(|m| m.as_str())
}

/// First `max` characters of `s` (not bytes; descriptions are Spanish).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
