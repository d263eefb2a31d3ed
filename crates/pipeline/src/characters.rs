//! Character sheets and poster generation for series and characters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use studio_core::characters::{
    build_detailed_visual_prompt, character_poster_prompt, color_palette, default_visual_prompt,
    extract_legacy_keywords, extract_visual_keywords, importance_level, legacy_importance_level,
    series_poster_prompt, CharacterSketch, SeriesLook, SeriesPosterInput, DEFAULT_FEATURE,
    DEFAULT_LEGACY_FEATURE,
};
use studio_core::status::{CharacterRole, PosterStatus};
use studio_core::types::DbId;
use studio_db::models::character::{Character, CreateCharacter};
use studio_db::models::poster_generation::{
    CreateCharacterVisualGeneration, CreateSeriesPosterGeneration,
};
use studio_db::models::series::Series;
use studio_db::repositories::{
    CharacterRepo, CharacterVisualGenerationRepo, SeriesPosterGenerationRepo, SeriesRepo,
};
use studio_db::DbPool;
use studio_providers::image::IMAGE_MODEL;

use crate::error::PipelineError;
use crate::media::MediaService;
use crate::usage::UsageLinks;

pub const CHARACTER_POSTER_CONTEXT: &str = "character_poster";
pub const SERIES_POSTER_CONTEXT: &str = "series_poster";

const POSTER_GENERATION_TYPE: &str = "poster";

/// A character as written by the series lore generator (and as stored in
/// the legacy `series.main_characters` blob).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoreCharacter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "characterArc", skip_serializing_if = "Option::is_none")]
    pub character_arc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
    #[serde(default)]
    pub distinctive_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing_style: Option<String>,
}

/// Full character sheet for a freshly generated lore character.
pub fn character_from_lore(series: &Series, lore: &LoreCharacter) -> CreateCharacter {
    let role = CharacterRole::from_ai(&lore.role);
    let keywords = extract_visual_keywords(&lore.description, &lore.distinctive_features);
    let features = if lore.distinctive_features.is_empty() {
        vec![DEFAULT_FEATURE.to_string()]
    } else {
        lore.distinctive_features.clone()
    };
    let visual_prompt = build_detailed_visual_prompt(
        &CharacterSketch {
            name: &lore.name,
            role,
            description: &lore.description,
            distinctive_features: &features,
        },
        &SeriesLook {
            visual_style: Some(&series.visual_style),
            setting: series.setting.as_deref(),
        },
    );

    CreateCharacter {
        series_id: series.id,
        name: lore.name.clone(),
        role: role.as_str().to_string(),
        description: lore.description.clone(),
        character_arc: lore.character_arc.clone(),
        visual_prompt: Some(visual_prompt),
        visual_keywords: keywords,
        age_range: lore.age_range.clone(),
        distinctive_features: features,
        clothing_style: lore.clothing_style.clone(),
        color_palette: palette(role),
        importance_level: Some(importance_level(role)),
        is_recurring: Some(true),
    }
}

/// Character sheet for a legacy `main_characters` entry. Legacy rows keep
/// the simpler keyword and importance rules they were created with.
pub fn character_from_legacy(series: &Series, lore: &LoreCharacter) -> CreateCharacter {
    let role = CharacterRole::from_ai(&lore.role);
    let features = if lore.distinctive_features.is_empty() {
        vec![DEFAULT_LEGACY_FEATURE.to_string()]
    } else {
        lore.distinctive_features.clone()
    };

    CreateCharacter {
        series_id: series.id,
        name: lore.name.clone(),
        role: role.as_str().to_string(),
        description: lore.description.clone(),
        character_arc: lore.character_arc.clone(),
        visual_prompt: Some(default_visual_prompt(role)),
        visual_keywords: extract_legacy_keywords(&lore.description),
        age_range: lore.age_range.clone(),
        distinctive_features: features,
        clothing_style: lore.clothing_style.clone(),
        color_palette: palette(role),
        importance_level: Some(legacy_importance_level(role)),
        is_recurring: Some(true),
    }
}

fn palette(role: CharacterRole) -> Vec<String> {
    color_palette(role).iter().map(|c| c.to_string()).collect()
}

fn sketch(character: &Character) -> CharacterSketch<'_> {
    CharacterSketch {
        name: &character.name,
        role: CharacterRole::from_ai(&character.role),
        description: &character.description,
        distinctive_features: &character.distinctive_features,
    }
}

#[derive(Clone)]
pub struct CharacterService {
    pool: DbPool,
    media: Arc<MediaService>,
}

impl CharacterService {
    pub fn new(pool: DbPool, media: Arc<MediaService>) -> Self {
        Self { pool, media }
    }

    /// Insert a character, filling a missing visual prompt, palette and
    /// importance from its role.
    pub async fn create_character(
        &self,
        mut input: CreateCharacter,
    ) -> Result<Character, PipelineError> {
        let role = CharacterRole::from_ai(&input.role);
        input.role = role.as_str().to_string();
        if input.visual_prompt.as_deref().map_or(true, |p| p.trim().is_empty()) {
            input.visual_prompt = Some(default_visual_prompt(role));
        }
        if input.color_palette.is_empty() {
            input.color_palette = palette(role);
        }
        if input.importance_level.is_none() {
            input.importance_level = Some(importance_level(role));
        }

        let character = CharacterRepo::create(&self.pool, &input).await?;
        tracing::info!(
            character_id = character.id,
            series_id = character.series_id,
            role = %character.role,
            "Character created",
        );
        Ok(character)
    }

    /// Generate, record and select a poster for a character.
    pub async fn generate_character_poster(
        &self,
        character_id: DbId,
        custom_prompt: Option<&str>,
        style: Option<&str>,
    ) -> Result<Character, PipelineError> {
        let character = CharacterRepo::find_by_id(&self.pool, character_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("character", character_id))?;
        let series = self.series(character.series_id).await?;
        let style = style.unwrap_or(&series.visual_style).to_string();
        let prompt = match custom_prompt.filter(|p| !p.trim().is_empty()) {
            Some(p) => p.to_string(),
            None => character_poster_prompt(
                &sketch(&character),
                &series.title,
                series.setting.as_deref(),
                &style,
            ),
        };

        CharacterRepo::set_poster(&self.pool, character_id, None, PosterStatus::Generating, None)
            .await?;

        let links = UsageLinks::series(series.id).with_character(character_id);
        let url = match self
            .media
            .generate_image(&prompt, &style, Some(CHARACTER_POSTER_CONTEXT), links)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(character_id, error = %e, "Character poster generation failed");
                self.record_character_attempt(character_id, &prompt, &style, None, Some(&e.to_string()))
                    .await;
                CharacterRepo::set_poster(
                    &self.pool,
                    character_id,
                    None,
                    PosterStatus::Failed,
                    Some(&prompt),
                )
                .await?;
                return Err(e);
            }
        };

        self.record_character_attempt(character_id, &prompt, &style, Some(&url), None)
            .await;
        let updated = CharacterRepo::set_poster(
            &self.pool,
            character_id,
            Some(&url),
            PosterStatus::Completed,
            Some(&prompt),
        )
        .await?
        .ok_or_else(|| PipelineError::not_found("character", character_id))?;

        tracing::info!(character_id, "Character poster generated");
        Ok(updated)
    }

    /// Generate, record and select a poster for a series.
    pub async fn generate_series_poster(
        &self,
        series_id: DbId,
        custom_prompt: Option<&str>,
        style: Option<&str>,
    ) -> Result<Series, PipelineError> {
        let series = self.series(series_id).await?;
        let style = style.unwrap_or(&series.visual_style).to_string();
        let prompt = match custom_prompt.filter(|p| !p.trim().is_empty()) {
            Some(p) => p.to_string(),
            None => series_poster_prompt(&SeriesPosterInput {
                title: &series.title,
                tagline: series.tagline.as_deref(),
                base_concept: &series.base_concept,
                full_lore: &series.full_lore,
                setting: series.setting.as_deref(),
                genre: &series.genre,
                themes: &series.themes,
                visual_style: &style,
            }),
        };

        SeriesRepo::set_poster(&self.pool, series_id, None, PosterStatus::Generating, None).await?;

        let url = match self
            .media
            .generate_image(
                &prompt,
                &style,
                Some(SERIES_POSTER_CONTEXT),
                UsageLinks::series(series_id),
            )
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(series_id, error = %e, "Series poster generation failed");
                self.record_series_attempt(series_id, &prompt, &style, None, Some(&e.to_string()))
                    .await;
                SeriesRepo::set_poster(&self.pool, series_id, None, PosterStatus::Failed, Some(&prompt))
                    .await?;
                return Err(e);
            }
        };

        self.record_series_attempt(series_id, &prompt, &style, Some(&url), None)
            .await;
        let updated = SeriesRepo::set_poster(
            &self.pool,
            series_id,
            Some(&url),
            PosterStatus::Completed,
            Some(&prompt),
        )
        .await?
        .ok_or_else(|| PipelineError::not_found("series", series_id))?;

        tracing::info!(series_id, "Series poster generated");
        Ok(updated)
    }

    /// Run a character poster in the background; failures are logged.
    pub fn spawn_character_poster(&self, character_id: DbId) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.generate_character_poster(character_id, None, None).await {
                tracing::warn!(character_id, error = %e, "Background character poster failed");
            }
        });
    }

    /// Run a series poster in the background; failures are logged.
    pub fn spawn_series_poster(&self, series_id: DbId) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.generate_series_poster(series_id, None, None).await {
                tracing::warn!(series_id, error = %e, "Background series poster failed");
            }
        });
    }

    /// Create character rows from the legacy `main_characters` blob. Names
    /// that already have a row are skipped, so the call can be repeated.
    pub async fn migrate_series_characters(
        &self,
        series_id: DbId,
    ) -> Result<Vec<Character>, PipelineError> {
        let series = self.series(series_id).await?;
        let Some(entries) = series.main_characters.as_array() else {
            tracing::debug!(series_id, "No legacy characters to migrate");
            return Ok(Vec::new());
        };

        let existing: Vec<String> = CharacterRepo::list_for_series(&self.pool, series_id)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut created = Vec::new();
        for entry in entries {
            let lore: LoreCharacter = match serde_json::from_value(entry.clone()) {
                Ok(lore) => lore,
                Err(e) => {
                    tracing::warn!(series_id, error = %e, "Skipping unreadable legacy character");
                    continue;
                }
            };
            if lore.name.trim().is_empty() || existing.contains(&lore.name) {
                continue;
            }
            let character =
                CharacterRepo::create(&self.pool, &character_from_legacy(&series, &lore)).await?;
            created.push(character);
        }

        tracing::info!(series_id, migrated = created.len(), "Legacy characters migrated");
        Ok(created)
    }

    // ---- private helpers ----

    async fn series(&self, series_id: DbId) -> Result<Series, PipelineError> {
        SeriesRepo::find_by_id(&self.pool, series_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("series", series_id))
    }

    async fn record_character_attempt(
        &self,
        character_id: DbId,
        prompt: &str,
        style: &str,
        url: Option<&str>,
        error: Option<&str>,
    ) {
        let input = CreateCharacterVisualGeneration {
            character_id,
            prompt: prompt.to_string(),
            visual_style: style.to_string(),
            generation_type: POSTER_GENERATION_TYPE.to_string(),
            image_url: url.map(str::to_string),
            status: attempt_status(url).as_str().to_string(),
            error_message: error.map(str::to_string),
            is_selected: url.is_some(),
            model_used: Some(IMAGE_MODEL.to_string()),
        };
        if let Err(e) = CharacterVisualGenerationRepo::create(&self.pool, &input).await {
            tracing::warn!(character_id, error = %e, "Failed to record character poster attempt");
        }
    }

    async fn record_series_attempt(
        &self,
        series_id: DbId,
        prompt: &str,
        style: &str,
        url: Option<&str>,
        error: Option<&str>,
    ) {
        let input = CreateSeriesPosterGeneration {
            series_id,
            prompt: prompt.to_string(),
            visual_style: style.to_string(),
            image_url: url.map(str::to_string),
            status: attempt_status(url).as_str().to_string(),
            error_message: error.map(str::to_string),
            is_selected: url.is_some(),
            model_used: Some(IMAGE_MODEL.to_string()),
        };
        if let Err(e) = SeriesPosterGenerationRepo::create(&self.pool, &input).await {
            tracing::warn!(series_id, error = %e, "Failed to record series poster attempt");
        }
    }
}

fn attempt_status(url: Option<&str>) -> PosterStatus {
    if url.is_some() {
        PosterStatus::Completed
    } else {
        PosterStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn series() -> Series {
        Series {
            id: 7,
            title: "Sombras de Oaxaca".into(),
            tagline: None,
            base_concept: "Una familia guarda un secreto".into(),
            full_lore: "Lore".into(),
            genre: vec!["drama".into()],
            themes: vec![],
            setting: Some("Oaxaca, 1985".into()),
            planned_seasons: 1,
            current_season: 1,
            episodes_per_season: 6,
            narrative_style: "continuous".into(),
            target_duration_per_episode: 180,
            visual_style: "cinematic".into(),
            script_style: "dramatic".into(),
            main_characters: json!([]),
            series_poster_url: None,
            series_poster_status: "pending".into(),
            series_poster_prompt: None,
            status: "draft".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lore_character_accepts_camel_case_arc() {
        let lore: LoreCharacter = serde_json::from_value(json!({
            "name": "Elena",
            "role": "Protagonist",
            "description": "Una periodista valiente",
            "characterArc": "Aprende a confiar",
        }))
        .unwrap();
        assert_eq!(lore.character_arc.as_deref(), Some("Aprende a confiar"));
    }

    #[test]
    fn lore_character_gets_role_attributes() {
        let lore = LoreCharacter {
            name: "Elena".into(),
            role: "Protagonist".into(),
            description: "Una periodista valiente con cabello negro".into(),
            ..Default::default()
        };
        let input = character_from_lore(&series(), &lore);

        assert_eq!(input.role, "protagonist");
        assert_eq!(input.importance_level, Some(10));
        assert_eq!(input.color_palette[0], "#3b82f6");
        assert_eq!(input.distinctive_features, vec![DEFAULT_FEATURE.to_string()]);
        assert!(input.visual_keywords.contains(&"periodista".to_string()));
        assert!(!input.visual_prompt.unwrap().is_empty());
    }

    #[test]
    fn legacy_character_uses_legacy_rules() {
        let lore = LoreCharacter {
            name: "Tomás".into(),
            role: "aliado".into(),
            description: "Un amigo fiel".into(),
            ..Default::default()
        };
        let input = character_from_legacy(&series(), &lore);

        assert_eq!(input.importance_level, Some(5));
        assert_eq!(input.distinctive_features, vec![DEFAULT_LEGACY_FEATURE.to_string()]);
        assert!(input.visual_prompt.unwrap().starts_with("Cinematic character portrait"));
    }

    #[test]
    fn unknown_roles_become_minor() {
        let lore = LoreCharacter {
            name: "X".into(),
            role: "narrator".into(),
            ..Default::default()
        };
        assert_eq!(character_from_lore(&series(), &lore).role, "minor");
    }
}
