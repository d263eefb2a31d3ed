//! Chat prompt builders. Every generator asks for bare JSON in Mexican
//! Spanish; the parsers in the services tolerate fences and preambles anyway.

use studio_core::styles::{ScriptStyle, StyleMetadata, VisualStyle};
use studio_db::models::character::Character;
use studio_db::models::episode::Episode;
use studio_db::models::segment::Segment;
use studio_db::models::series::Series;

const JSON_ONLY: &str =
    "Respond ONLY with a valid JSON object. No introductory text, no markdown code blocks.";

const LANGUAGE_RULES: &str = "All narration MUST be in Mexican Spanish (Español de México). \
     Write every number out in Spanish words (\"treinta y dos\", not \"32\") so it reads \
     naturally in text-to-speech.";

fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Standalone stories
// ---------------------------------------------------------------------------

pub fn story_system(
    duration: u32,
    segment_count: u32,
    visual: StyleMetadata,
    script: StyleMetadata,
) -> String {
    format!(
        "You are a video script generator. Turn the user's idea into a structured \
         {duration}-second story.\n\n\
         RULES:\n\
         1. {LANGUAGE_RULES}\n\
         2. Narration tone: \"{}\". {}\n\
         3. Visual prompts describe scenes in the \"{}\" style: {}\n\
         4. Create exactly {segment_count} segments of roughly ten seconds each.\n\
         5. {JSON_ONLY}\n\n\
         FORMAT:\n\
         {{\"story_title\": \"string\", \"segments\": [{{\"duration_seconds\": 10, \
         \"text\": \"narration\", \"visual_prompt\": \"detailed image prompt\"}}]}}",
        script.label, script.description, visual.label, visual.description,
    )
}

pub fn story_user(base_idea: &str) -> String {
    format!("Base Idea: {base_idea}")
}

// ---------------------------------------------------------------------------
// Episodes
// ---------------------------------------------------------------------------

pub fn episode_segments_system(segment_count: u32, visual: StyleMetadata, script: StyleMetadata) -> String {
    format!(
        "You are breaking a serialized episode down into cinematic video segments.\n\n\
         RULES:\n\
         1. {LANGUAGE_RULES}\n\
         2. Narration tone: \"{}\". {}\n\
         3. Visual prompts use the \"{}\" style: {}\n\
         4. Generate EXACTLY {segment_count} segments. The first is \"intro\", the last is \
         \"cliffhanger\", the rest are \"main\".\n\
         5. {JSON_ONLY}\n\n\
         FORMAT:\n\
         {{\"segments\": [{{\"segment_index\": 0, \"segment_type\": \"intro\", \
         \"character_focus\": \"optional name\", \"text\": \"15-30 words\", \
         \"visual_prompt\": \"lighting, composition, mood, angle\", \"duration_seconds\": 15}}]}}",
        script.label, script.description, visual.label, visual.description,
    )
}

pub fn episode_segments_user(
    series: &Series,
    episode: &Episode,
    characters: &[Character],
    segment_count: u32,
    target_duration: i32,
) -> String {
    let cast = characters
        .iter()
        .map(|c| format!("{} ({}): {}", c.name, c.role, c.description))
        .collect::<Vec<_>>()
        .join("\n");
    let featured = episode
        .featured_characters
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|fc| {
                    let name = fc.get("name")?.as_str()?;
                    let focus = fc.get("focus").and_then(|f| f.as_str()).unwrap_or("featured");
                    Some(format!("{name} ({focus})"))
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Main characters".to_string());

    let mut continuity = String::new();
    if let Some(recap) = &episode.previous_episode_recap {
        continuity.push_str(&format!("\nCONTINUIDAD DEL EPISODIO ANTERIOR:\n{recap}\n"));
        if let Some(cliffhanger) = &episode.cliffhanger {
            continuity.push_str(&format!("ÚLTIMA ESCENA DRAMÁTICA: {cliffhanger}\n"));
        }
    }
    let beats = if episode.story_beats.is_empty() {
        "Follow the synopsis".to_string()
    } else {
        numbered(&episode.story_beats)
    };
    let tease = episode
        .next_episode_tease
        .as_deref()
        .map(|t| format!("\nTEASER PARA ESTE EPISODIO: {t}\n"))
        .unwrap_or_default();
    let per_segment = target_duration / segment_count.max(1) as i32;

    format!(
        "Break this episode into {segment_count} segments (~{per_segment}s each, \
         ~{target_duration}s total).\n\n\
         SERIES: {}\nEPISODE: {}\n\nSERIES LORE:\n{}\n{continuity}\n\
         EPISODE SYNOPSIS:\n{}\n\nSTORY BEATS:\n{beats}\n\n\
         AVAILABLE CHARACTERS:\n{cast}\n\nFEATURED IN THIS EPISODE:\n{featured}\n{tease}\n\
         Number the segments with segment_index 0 to {}.",
        series.title,
        episode.title,
        series.full_lore,
        episode.synopsis,
        segment_count.saturating_sub(1),
    )
}

pub fn continuity_system(script: StyleMetadata) -> String {
    format!(
        "You are analysing a TV episode to write continuity for the next one.\n\n\
         RULES:\n\
         1. {LANGUAGE_RULES}\n\
         2. Keep the \"{}\" tone: {}\n\
         3. {JSON_ONLY}\n\n\
         FORMAT:\n\
         {{\"previous_episode_recap\": \"2-3 sentences\", \
         \"cliffhanger\": \"how the episode ended, if dramatic\", \
         \"next_episode_tease\": \"1-2 sentences\"}}",
        script.label, script.description,
    )
}

pub fn continuity_user(series_title: &str, previous: &Episode, segments: &[Segment]) -> String {
    let summary = segments
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Segmento {} ({}): {}", i + 1, s.segment_type, s.text))
        .collect::<Vec<_>>()
        .join("\n");
    let beats = if previous.story_beats.is_empty() {
        String::new()
    } else {
        format!("\nMOMENTOS CLAVE:\n{}\n", numbered(&previous.story_beats))
    };
    format!(
        "SERIE: {series_title}\nEPISODIO ANTERIOR: {}\n\nSINOPSIS:\n{}\n\n\
         SEGMENTOS DEL EPISODIO:\n{summary}\n{beats}\n\
         Write the recap, the cliffhanger (if any) and a teaser for the next episode.",
        previous.title, previous.synopsis,
    )
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

pub struct LoreParams<'a> {
    pub base_concept: &'a str,
    pub planned_seasons: i32,
    pub episodes_per_season: i32,
    pub visual_style: &'a str,
    pub script_style: &'a str,
    pub target_duration: i32,
}

pub fn series_lore_system(params: &LoreParams<'_>) -> String {
    format!(
        "You are a master storyteller creating a serialized video series.\n\n\
         RULES:\n\
         1. {LANGUAGE_RULES}\n\
         2. Use a \"{}\" tone and a \"{}\" visual aesthetic.\n\
         3. {JSON_ONLY}\n\n\
         FORMAT:\n\
         {{\"title\": \"\", \"tagline\": \"\", \"full_lore\": \"500-800 words\", \
         \"genre\": [\"\"], \"themes\": [\"\"], \"setting\": \"\", \"narrative_style\": \"continuous\", \
         \"main_characters\": [{{\"name\": \"\", \"role\": \"protagonist|antagonist|aliado|supporting\", \
         \"description\": \"\", \"character_arc\": \"\", \"age_range\": \"\", \
         \"distinctive_features\": [\"\"], \"clothing_style\": \"\"}}], \
         \"season_outlines\": [{{\"season_number\": 1, \"theme\": \"\", \"arc\": \"\", \
         \"episode_summaries\": [\"\"]}}]}}",
        params.script_style, params.visual_style,
    )
}

pub fn series_lore_user(params: &LoreParams<'_>) -> String {
    format!(
        "Create a serialized video series from this concept:\n\n\
         BASE CONCEPT: {}\n\n\
         - Seasons: {}\n- Episodes per season: {}\n- Visual style: {}\n- Script style: {}\n\
         - Duration: ~{} seconds per episode\n\n\
         Include a catchy title and tagline, 2-4 genres, 3-5 themes, a detailed setting, \
         3-5 main characters with 3-5 distinctive visual features each, and one outline per \
         season with {} episode summaries.",
        params.base_concept,
        params.planned_seasons,
        params.episodes_per_season,
        params.visual_style,
        params.script_style,
        params.target_duration,
        params.episodes_per_season,
    )
}

pub fn episodes_system(episode_count: i32) -> String {
    format!(
        "You generate episode data. You MUST generate exactly {episode_count} episodes.\n\n\
         Each episode MUST have: episode_number, title, synopsis (100+ words), story_beats \
         (4+ items), featured_characters ([{{\"name\", \"focus\"}}]), cliffhanger, is_premiere, \
         is_finale. An empty episodes array is not acceptable.\n\
         {JSON_ONLY}\n\
         Start your response with: {{\"episodes\":["
    )
}

pub fn episodes_user(
    series: &Series,
    characters: &[String],
    season_number: i32,
    episode_count: i32,
) -> String {
    format!(
        "Generate {episode_count} episodes for season {season_number} of \"{}\".\n\n\
         LORE:\n{}\n\nCHARACTERS: {}\n\n\
         Each episode runs about {} seconds. Number them 1 to {episode_count}.",
        series.title,
        series.full_lore,
        characters.join(", "),
        series.target_duration_per_episode,
    )
}

// ---------------------------------------------------------------------------
// Wan stories
// ---------------------------------------------------------------------------

pub fn wan_story_system(visual_style: &str, segment_count: u32) -> String {
    format!(
        "You are an expert short-form video director. Write a video script for the \
         user's premise.\n\n\
         RULES:\n\
         1. All \"text_content\" MUST be in Mexican Spanish.\n\
         2. Generate EXACTLY {segment_count} segments (intro, middle, climax).\n\
         3. Each segment is a few seconds of video in the \"{visual_style}\" style.\n\
         4. {JSON_ONLY}\n\n\
         FORMAT:\n\
         {{\"title\": \"\", \"segments\": [{{\"text_content\": \"narration\", \
         \"visual_prompt\": \"lighting, camera angle, action\"}}]}}"
    )
}

pub fn wan_story_user(premise: &str) -> String {
    format!("Premise: {premise}")
}

/// Metadata for a visual style given by key or label; unknown values fall
/// back to the default style.
pub fn visual_meta(style: &str) -> StyleMetadata {
    VisualStyle::parse(style).unwrap_or_default().metadata()
}

pub fn script_meta(style: &str) -> StyleMetadata {
    ScriptStyle::parse(style).unwrap_or_default().metadata()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_styles_fall_back_to_defaults() {
        assert_eq!(visual_meta("cinematic").key, "cinematic-realistic");
        assert_eq!(script_meta("dramatic").key, "dramatic-telenovela");
        assert_eq!(visual_meta("Anime").key, "anime");
    }

    #[test]
    fn story_prompt_states_segment_count() {
        let prompt = story_system(30, 3, visual_meta("anime"), script_meta("scary-horror"));
        assert!(prompt.contains("exactly 3 segments"));
        assert!(prompt.contains("30-second"));
    }
}
