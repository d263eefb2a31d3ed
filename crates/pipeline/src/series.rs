//! Series creation from a concept, season episode batches and the series
//! read side.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use studio_core::analytics::{EpisodeFacts, SeriesAnalytics};
use studio_core::segment_plan::{
    premiere_and_finale, DEFAULT_EPISODES_PER_SEASON, DEFAULT_EPISODE_DURATION_SECS,
    DEFAULT_PLANNED_SEASONS,
};
use studio_core::status::{CharacterRole, EpisodeStatus};
use studio_core::types::DbId;
use studio_db::models::character::Character;
use studio_db::models::episode::{CreateEpisode, Episode};
use studio_db::models::series::{CreateSeries, Series};
use studio_db::repositories::{CharacterRepo, EpisodeRepo, SeriesRepo};
use studio_db::DbPool;
use studio_providers::{ChatCompletion, ChatRequest, TextGenerator};

use crate::characters::{character_from_lore, CharacterService, LoreCharacter};
use crate::chat_json::chat_json;
use crate::error::PipelineError;
use crate::prompts::{self, LoreParams};
use crate::usage::{TextUsage, UsageLinks, UsageRecorder};

pub const LORE_CONTEXT: &str = "series_lore_generation";
pub const EPISODE_BATCH_CONTEXT: &str = "episode_batch_generation";

pub const DEFAULT_SERIES_VISUAL_STYLE: &str = "cinematic";
pub const DEFAULT_SERIES_SCRIPT_STYLE: &str = "dramatic";

/// `(temperature, max_tokens)` per episode batch attempt. Later attempts
/// cool down and allow longer answers.
const EPISODE_ATTEMPTS: [(f64, u32); 3] = [(0.9, 6000), (0.7, 8000), (0.5, 10000)];
const EPISODE_TOP_P: f64 = 0.95;
const EPISODE_RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSeriesRequest {
    pub base_concept: String,
    pub planned_seasons: Option<i32>,
    pub episodes_per_season: Option<i32>,
    pub visual_style: Option<String>,
    pub script_style: Option<String>,
    pub target_duration_per_episode: Option<i32>,
}

/// Lore document written by the chat model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedLore {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub full_lore: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub setting: Option<String>,
    #[serde(default)]
    pub narrative_style: Option<String>,
    #[serde(default)]
    pub main_characters: Vec<LoreCharacter>,
    #[serde(default)]
    pub season_outlines: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedEpisode {
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub story_beats: Vec<String>,
    #[serde(default)]
    pub featured_characters: Vec<serde_json::Value>,
    #[serde(default)]
    pub cliffhanger: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedEpisodes {
    #[serde(default)]
    episodes: Vec<GeneratedEpisode>,
}

/// Ask for a season's episodes with escalating settings: each retry lowers
/// the temperature and raises the token budget, after a 1s pause. The first
/// fully populated array wins; otherwise the last attempt's error is
/// returned.
pub async fn request_episodes(
    text: &dyn TextGenerator,
    system: &str,
    user: &str,
    series_id: DbId,
    season_number: i32,
) -> Result<(Vec<GeneratedEpisode>, ChatCompletion), PipelineError> {
    let mut last_error = None;
    for (attempt, (temperature, max_tokens)) in EPISODE_ATTEMPTS.into_iter().enumerate() {
        if attempt > 0 {
            tokio::time::sleep(EPISODE_RETRY_PAUSE).await;
        }
        let request = ChatRequest::new(system, user)
            .temperature(temperature)
            .max_tokens(max_tokens)
            .top_p(EPISODE_TOP_P);

        let result = chat_json::<GeneratedEpisodes>(text, request, "episodes")
            .await
            .and_then(|(generated, completion)| {
                validate_episodes(&generated.episodes)?;
                Ok((generated.episodes, completion))
            });
        match result {
            Ok(found) => return Ok(found),
            Err(e) => {
                tracing::warn!(
                    series_id,
                    season_number,
                    attempt = attempt + 1,
                    temperature,
                    max_tokens,
                    error = %e,
                    "Episode generation attempt failed",
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        PipelineError::IncompleteGeneration("No episodes generated".to_string())
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSeries {
    #[serde(flatten)]
    pub series: Series,
    pub characters: Vec<Character>,
}

/// Reject lore without a title or body.
pub fn validate_lore(lore: &GeneratedLore) -> Result<(), PipelineError> {
    let mut missing = Vec::new();
    if lore.title.trim().is_empty() {
        missing.push("title");
    }
    if lore.full_lore.trim().is_empty() {
        missing.push("full_lore");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::IncompleteGeneration(format!(
            "Series lore is missing: {}",
            missing.join(", ")
        )))
    }
}

/// Every episode needs a number, title, synopsis, beats and cast.
pub fn validate_episodes(episodes: &[GeneratedEpisode]) -> Result<(), PipelineError> {
    if episodes.is_empty() {
        return Err(PipelineError::IncompleteGeneration(
            "No episodes generated".to_string(),
        ));
    }

    for (position, episode) in episodes.iter().enumerate() {
        let mut missing = Vec::new();
        if episode.title.trim().is_empty() {
            missing.push("title");
        }
        if episode.synopsis.trim().is_empty() {
            missing.push("synopsis");
        }
        if episode.story_beats.is_empty() {
            missing.push("story_beats");
        }
        if episode.featured_characters.is_empty() {
            missing.push("featured_characters");
        }
        if episode.episode_number.is_none() {
            missing.push("episode_number");
        }
        if !missing.is_empty() {
            return Err(PipelineError::IncompleteGeneration(format!(
                "Episode {} is missing: {}",
                position + 1,
                missing.join(", ")
            )));
        }
    }
    Ok(())
}

/// Rows for the episodes whose numbers are not taken yet in the season.
pub fn plan_episodes(
    series: &Series,
    season_number: i32,
    generated: Vec<GeneratedEpisode>,
    existing_numbers: &[i32],
) -> Vec<CreateEpisode> {
    let mut taken: HashSet<i32> = existing_numbers.iter().copied().collect();
    generated
        .into_iter()
        .filter_map(|episode| {
            let number = episode.episode_number?;
            if !taken.insert(number) {
                tracing::debug!(series_id = series.id, season_number, number, "Episode exists, skipping");
                return None;
            }
            let (is_premiere, is_finale) = premiere_and_finale(number, series.episodes_per_season);
            Some(CreateEpisode {
                series_id: series.id,
                season_number,
                episode_number: number,
                title: episode.title,
                synopsis: episode.synopsis,
                story_beats: episode.story_beats,
                featured_characters: serde_json::Value::Array(episode.featured_characters),
                target_duration: series.target_duration_per_episode,
                cliffhanger: episode.cliffhanger.filter(|c| !c.trim().is_empty()),
                is_premiere,
                is_finale,
            })
        })
        .collect()
}

/// `"name (role)"` for the episode prompt, from character rows or, for
/// series that were never migrated, the legacy blob.
fn cast_list(series: &Series, characters: &[Character]) -> Vec<String> {
    if !characters.is_empty() {
        return characters
            .iter()
            .map(|c| format!("{} ({})", c.name, c.role))
            .collect();
    }
    series
        .main_characters
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let name = entry.get("name")?.as_str()?;
                    let role = entry.get("role").and_then(|r| r.as_str()).unwrap_or("supporting");
                    Some(format!("{name} ({role})"))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct SeriesService {
    pool: DbPool,
    text: Arc<dyn TextGenerator>,
    usage: UsageRecorder,
    characters: CharacterService,
}

impl SeriesService {
    pub fn new(
        pool: DbPool,
        text: Arc<dyn TextGenerator>,
        usage: UsageRecorder,
        characters: CharacterService,
    ) -> Self {
        Self {
            pool,
            text,
            usage,
            characters,
        }
    }

    /// Write the lore for a concept, save the series in `draft`, create its
    /// characters and kick off the posters.
    pub async fn create_series(
        &self,
        request: CreateSeriesRequest,
    ) -> Result<CreatedSeries, PipelineError> {
        let visual_style = request
            .visual_style
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERIES_VISUAL_STYLE.to_string());
        let script_style = request
            .script_style
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERIES_SCRIPT_STYLE.to_string());
        let params = LoreParams {
            base_concept: &request.base_concept,
            planned_seasons: request.planned_seasons.unwrap_or(DEFAULT_PLANNED_SEASONS),
            episodes_per_season: request
                .episodes_per_season
                .unwrap_or(DEFAULT_EPISODES_PER_SEASON),
            visual_style: &visual_style,
            script_style: &script_style,
            target_duration: request
                .target_duration_per_episode
                .unwrap_or(DEFAULT_EPISODE_DURATION_SECS),
        };

        let (lore, completion) = self.generate_series_lore(&params).await?;

        let series = SeriesRepo::create(
            &self.pool,
            &CreateSeries {
                title: lore.title.clone(),
                tagline: lore.tagline.clone(),
                base_concept: request.base_concept.clone(),
                full_lore: lore.full_lore.clone(),
                genre: lore.genre.clone(),
                themes: lore.themes.clone(),
                setting: lore.setting.clone(),
                planned_seasons: params.planned_seasons,
                episodes_per_season: params.episodes_per_season,
                narrative_style: lore
                    .narrative_style
                    .clone()
                    .unwrap_or_else(|| "continuous".to_string()),
                target_duration_per_episode: params.target_duration,
                visual_style: visual_style.clone(),
                script_style: script_style.clone(),
                main_characters: serde_json::to_value(&lore.main_characters)?,
            },
        )
        .await?;

        tracing::info!(
            series_id = series.id,
            title = %series.title,
            characters = lore.main_characters.len(),
            "Series created",
        );

        self.record(
            &completion,
            LORE_CONTEXT,
            UsageLinks::series(series.id),
            json!({
                "base_concept": request.base_concept,
                "planned_seasons": params.planned_seasons,
                "episodes_per_season": params.episodes_per_season,
            }),
        )
        .await;

        let characters = self
            .create_characters_for_series(&series, &lore.main_characters)
            .await;
        self.characters.spawn_series_poster(series.id);

        Ok(CreatedSeries { series, characters })
    }

    /// Ask the chat model for the series lore.
    pub async fn generate_series_lore(
        &self,
        params: &LoreParams<'_>,
    ) -> Result<(GeneratedLore, ChatCompletion), PipelineError> {
        let request = ChatRequest::new(
            prompts::series_lore_system(params),
            prompts::series_lore_user(params),
        )
        .temperature(0.8);
        let (lore, completion): (GeneratedLore, _) =
            chat_json(self.text.as_ref(), request, "series lore").await?;
        validate_lore(&lore)?;
        Ok((lore, completion))
    }

    /// Insert a row per generated character. A failed insert is logged and
    /// skipped; protagonists and antagonists get a background poster.
    pub async fn create_characters_for_series(
        &self,
        series: &Series,
        lore: &[LoreCharacter],
    ) -> Vec<Character> {
        let mut created = Vec::with_capacity(lore.len());
        for entry in lore {
            if entry.name.trim().is_empty() {
                tracing::warn!(series_id = series.id, "Skipping unnamed character");
                continue;
            }
            let input = character_from_lore(series, entry);
            match CharacterRepo::create(&self.pool, &input).await {
                Ok(character) => {
                    let role = CharacterRole::from_ai(&character.role);
                    if studio_core::characters::wants_auto_poster(role) {
                        self.characters.spawn_character_poster(character.id);
                    }
                    created.push(character);
                }
                Err(e) => {
                    tracing::error!(
                        series_id = series.id,
                        name = %entry.name,
                        error = %e,
                        "Failed to create character",
                    );
                }
            }
        }
        created
    }

    /// Generate and store a season's episodes.
    pub async fn generate_episodes(
        &self,
        series_id: DbId,
        season_number: i32,
    ) -> Result<Vec<Episode>, PipelineError> {
        let series = self.series(series_id).await?;
        let characters = CharacterRepo::list_for_series(&self.pool, series_id).await?;
        let cast = cast_list(&series, &characters);
        let episode_count = series.episodes_per_season;

        let (generated, completion) = request_episodes(
            self.text.as_ref(),
            &prompts::episodes_system(episode_count),
            &prompts::episodes_user(&series, &cast, season_number, episode_count),
            series_id,
            season_number,
        )
        .await?;

        self.record(
            &completion,
            EPISODE_BATCH_CONTEXT,
            UsageLinks::series(series_id),
            json!({ "season_number": season_number, "episode_count": generated.len() }),
        )
        .await;

        let generated_count = generated.len();
        let existing = EpisodeRepo::list_numbers(&self.pool, series_id, season_number).await?;
        let rows = plan_episodes(&series, season_number, generated, &existing);
        let episodes = EpisodeRepo::create_many(&self.pool, &rows).await?;

        tracing::info!(
            series_id,
            season_number,
            created = episodes.len(),
            skipped = generated_count - rows.len(),
            "Season episodes generated",
        );
        Ok(episodes)
    }

    // ---- read side ----

    pub async fn series_analytics(&self, series_id: DbId) -> Result<SeriesAnalytics, PipelineError> {
        self.series(series_id).await?;
        let rows = SeriesRepo::list_episode_statuses(&self.pool, series_id).await?;
        let facts: Vec<EpisodeFacts> = rows
            .into_iter()
            .filter_map(|row| match EpisodeStatus::from_str(&row.status) {
                Ok(status) => Some(EpisodeFacts {
                    status,
                    actual_duration: row.actual_duration,
                }),
                Err(e) => {
                    tracing::warn!(series_id, error = %e, "Skipping episode with unknown status");
                    None
                }
            })
            .collect();
        Ok(SeriesAnalytics::from_episodes(&facts))
    }

    pub async fn next_episode_number(
        &self,
        series_id: DbId,
        season_number: i32,
    ) -> Result<i32, PipelineError> {
        Ok(EpisodeRepo::next_episode_number(&self.pool, series_id, season_number).await?)
    }

    pub async fn episode_exists(
        &self,
        series_id: DbId,
        season_number: i32,
        episode_number: i32,
    ) -> Result<bool, PipelineError> {
        Ok(EpisodeRepo::exists(&self.pool, series_id, season_number, episode_number).await?)
    }

    // ---- private helpers ----

    async fn series(&self, series_id: DbId) -> Result<Series, PipelineError> {
        SeriesRepo::find_by_id(&self.pool, series_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("series", series_id))
    }

    async fn record(
        &self,
        completion: &ChatCompletion,
        context: &str,
        links: UsageLinks,
        metadata: serde_json::Value,
    ) {
        let Some(usage) = completion.usage else {
            return;
        };
        self.usage
            .record_text_usage(TextUsage {
                usage,
                model: completion.model.clone(),
                context_type: context.to_string(),
                links,
                generation_id: None,
                metadata,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Utc;
    use studio_providers::ProviderError;

    use super::*;

    /// Answers chat requests from a fixed script and records each request.
    #[derive(Default)]
    struct ScriptedText {
        answers: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedText {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedText {
        async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let content = self.answers.lock().unwrap().pop_front().unwrap_or_default();
            Ok(ChatCompletion {
                content,
                usage: None,
                finish_reason: Some("stop".into()),
                model: "qwen-plus".into(),
            })
        }
    }

    fn series() -> Series {
        Series {
            id: 3,
            title: "Herencia".into(),
            tagline: Some("Nada se olvida".into()),
            base_concept: "Una herencia maldita".into(),
            full_lore: "Lore".into(),
            genre: vec![],
            themes: vec![],
            setting: None,
            planned_seasons: 1,
            current_season: 1,
            episodes_per_season: 3,
            narrative_style: "continuous".into(),
            target_duration_per_episode: 120,
            visual_style: "cinematic".into(),
            script_style: "dramatic".into(),
            main_characters: json!([{"name": "Rosa", "role": "protagonist"}, {"role": "x"}]),
            series_poster_url: None,
            series_poster_status: "pending".into(),
            series_poster_prompt: None,
            status: "draft".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn episodes(json: serde_json::Value) -> Vec<GeneratedEpisode> {
        serde_json::from_value::<GeneratedEpisodes>(json).unwrap().episodes
    }

    fn complete_episode(number: i32) -> serde_json::Value {
        json!({
            "episode_number": number,
            "title": format!("Capítulo {number}"),
            "synopsis": "Algo pasa.",
            "story_beats": ["uno", "dos"],
            "featured_characters": [{"name": "Rosa", "focus": "main"}],
            "cliffhanger": "",
        })
    }

    #[test]
    fn validation_names_missing_fields() {
        let generated = episodes(json!({"episodes": [
            complete_episode(1),
            {"episode_number": 2, "title": "Dos", "synopsis": " "},
        ]}));
        assert_matches!(
            validate_episodes(&generated),
            Err(PipelineError::IncompleteGeneration(msg))
                if msg == "Episode 2 is missing: synopsis, story_beats, featured_characters"
        );
        assert_matches!(
            validate_episodes(&[]),
            Err(PipelineError::IncompleteGeneration(_))
        );
    }

    #[test]
    fn plan_skips_taken_numbers_and_flags_season_edges() {
        let generated = episodes(json!({"episodes": [
            complete_episode(1),
            complete_episode(2),
            complete_episode(3),
            complete_episode(3),
        ]}));
        let rows = plan_episodes(&series(), 1, generated, &[2]);

        let numbers: Vec<i32> = rows.iter().map(|r| r.episode_number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert!(rows[0].is_premiere && !rows[0].is_finale);
        assert!(rows[1].is_finale && !rows[1].is_premiere);
        assert_eq!(rows[0].target_duration, 120);
        assert_eq!(rows[0].cliffhanger, None);
    }

    #[test]
    fn lore_requires_title_and_body() {
        let lore = GeneratedLore {
            title: "T".into(),
            ..Default::default()
        };
        assert_matches!(
            validate_lore(&lore),
            Err(PipelineError::IncompleteGeneration(msg)) if msg.ends_with("full_lore")
        );
    }

    #[test]
    fn cast_falls_back_to_legacy_blob() {
        assert_eq!(cast_list(&series(), &[]), vec!["Rosa (protagonist)".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn episode_requests_escalate_until_complete() {
        let valid = json!({"episodes": [complete_episode(1), complete_episode(2)]}).to_string();
        let text = ScriptedText::new(&[
            r#"{"episodes": []}"#,
            r#"{"episodes": [{"episode_number": 1, "title": "Capítulo"#,
            valid.as_str(),
        ]);
        let started = tokio::time::Instant::now();

        let (generated, _completion) = request_episodes(&text, "system", "user", 3, 1)
            .await
            .unwrap();

        assert_eq!(generated.len(), 2);
        assert_eq!(generated[1].title, "Capítulo 2");
        assert_eq!(started.elapsed(), Duration::from_secs(2));

        let requests = text.requests.lock().unwrap();
        let settings: Vec<(f64, Option<u32>, Option<f64>)> = requests
            .iter()
            .map(|r| (r.temperature, r.max_tokens, r.top_p))
            .collect();
        assert_eq!(
            settings,
            vec![
                (0.9, Some(6000), Some(0.95)),
                (0.7, Some(8000), Some(0.95)),
                (0.5, Some(10000), Some(0.95)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn episode_requests_return_last_error_after_three_attempts() {
        let text = ScriptedText::new(&[r#"{"episodes": []}"#, r#"{"episodes": []}"#, "sin json"]);

        let result = request_episodes(&text, "system", "user", 3, 1).await;

        assert_matches!(result, Err(PipelineError::MalformedResponse(_)));
        assert_eq!(text.requests.lock().unwrap().len(), 3);
    }
}
