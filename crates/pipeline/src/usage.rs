//! Usage recording and aggregation.
//!
//! Every AI call appends one `token_usage` row. Recording never fails the
//! caller: a write error is logged and `None` is returned. Summaries are
//! computed on read by [`studio_core::usage::summarize`].

use std::sync::Arc;

use serde::Deserialize;
use studio_core::status::GenerationType;
use studio_core::types::DbId;
use studio_core::usage::{summarize, union_by_id, UsageFact, UsageSummary, USAGE_PROVIDER};
use studio_db::models::token_usage::{CreateTokenUsage, TokenUsage};
use studio_providers::ChatUsage;

use crate::error::PipelineError;
use crate::store::{UsageFilter, UsageStore};

/// Entities a usage fact is attributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageLinks {
    pub series_id: Option<DbId>,
    pub episode_id: Option<DbId>,
    pub segment_id: Option<DbId>,
    pub story_id: Option<DbId>,
    pub character_id: Option<DbId>,
}

impl UsageLinks {
    pub fn story(story_id: DbId) -> Self {
        Self {
            story_id: Some(story_id),
            ..Default::default()
        }
    }

    pub fn series(series_id: DbId) -> Self {
        Self {
            series_id: Some(series_id),
            ..Default::default()
        }
    }

    pub fn episode(series_id: DbId, episode_id: DbId) -> Self {
        Self {
            series_id: Some(series_id),
            episode_id: Some(episode_id),
            ..Default::default()
        }
    }

    pub fn with_segment(mut self, segment_id: DbId) -> Self {
        self.segment_id = Some(segment_id);
        self
    }

    pub fn with_character(mut self, character_id: DbId) -> Self {
        self.character_id = Some(character_id);
        self
    }
}

/// A chat completion's token counts plus attribution.
#[derive(Debug, Clone)]
pub struct TextUsage {
    pub usage: ChatUsage,
    pub model: String,
    pub context_type: String,
    pub links: UsageLinks,
    pub generation_id: Option<DbId>,
    pub metadata: serde_json::Value,
}

/// An image, audio or video call; these carry no token counts.
#[derive(Debug, Clone)]
pub struct MediaUsage {
    pub generation_type: GenerationType,
    pub model: String,
    pub context_type: String,
    pub links: UsageLinks,
    pub metadata: serde_json::Value,
}

/// Aggregation scopes exposed by the read side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageScope {
    Story,
    Episode,
    Segment,
    Series,
    Character,
}

#[derive(Clone)]
pub struct UsageRecorder {
    store: Arc<dyn UsageStore>,
}

impl UsageRecorder {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    // ---- write side ----

    pub async fn record_text_usage(&self, usage: TextUsage) -> Option<TokenUsage> {
        let input = CreateTokenUsage {
            generation_type: GenerationType::Text.as_str().to_string(),
            model_used: usage.model,
            provider: USAGE_PROVIDER.to_string(),
            prompt_tokens: saturate(usage.usage.prompt_tokens),
            completion_tokens: saturate(usage.usage.completion_tokens),
            total_tokens: saturate(usage.usage.total_tokens),
            context_type: Some(usage.context_type),
            generation_id: usage.generation_id,
            metadata: Some(usage.metadata),
            ..links_into(usage.links)
        };
        self.insert(input).await
    }

    pub async fn record_media_usage(&self, usage: MediaUsage) -> Option<TokenUsage> {
        let input = CreateTokenUsage {
            generation_type: usage.generation_type.as_str().to_string(),
            model_used: usage.model,
            provider: USAGE_PROVIDER.to_string(),
            context_type: Some(usage.context_type),
            metadata: Some(usage.metadata),
            ..links_into(usage.links)
        };
        self.insert(input).await
    }

    async fn insert(&self, input: CreateTokenUsage) -> Option<TokenUsage> {
        match self.store.insert_usage(&input).await {
            Ok(row) => {
                tracing::debug!(
                    usage_id = row.id,
                    generation_type = %row.generation_type,
                    context = row.context_type.as_deref().unwrap_or_default(),
                    total_tokens = row.total_tokens,
                    "Usage recorded",
                );
                Some(row)
            }
            Err(e) => {
                tracing::warn!(
                    generation_type = %input.generation_type,
                    context = input.context_type.as_deref().unwrap_or_default(),
                    error = %e,
                    "Failed to record usage",
                );
                None
            }
        }
    }

    // ---- read side ----

    pub async fn summary(&self, scope: UsageScope, id: DbId) -> Result<UsageSummary, PipelineError> {
        match scope {
            UsageScope::Segment => self.usage_by_segment(id).await,
            UsageScope::Episode => self.usage_by_episode(id).await,
            UsageScope::Story => self.usage_by_story(id).await,
            UsageScope::Character => self.usage_by_character(id).await,
            UsageScope::Series => self.usage_by_series(id).await,
        }
    }

    pub async fn usage_by_segment(&self, segment_id: DbId) -> Result<UsageSummary, PipelineError> {
        self.summarize_filter(UsageFilter::Segment(segment_id)).await
    }

    pub async fn usage_by_episode(&self, episode_id: DbId) -> Result<UsageSummary, PipelineError> {
        self.summarize_filter(UsageFilter::Episode(episode_id)).await
    }

    pub async fn usage_by_story(&self, story_id: DbId) -> Result<UsageSummary, PipelineError> {
        self.summarize_filter(UsageFilter::Story(story_id)).await
    }

    pub async fn usage_by_character(&self, character_id: DbId) -> Result<UsageSummary, PipelineError> {
        self.summarize_filter(UsageFilter::Character(character_id)).await
    }

    /// Rows of every episode in the series plus every row tagged with the
    /// series, counted once each.
    pub async fn usage_by_series(&self, series_id: DbId) -> Result<UsageSummary, PipelineError> {
        let series_rows = self.facts(UsageFilter::Series(series_id)).await?;
        let episode_ids = self.store.episode_ids(series_id, None).await?;
        let episode_rows = self.facts(UsageFilter::Episodes(episode_ids)).await?;
        Ok(summarize(&union_by_id(series_rows, episode_rows)))
    }

    /// Rows of the season's episodes plus series-level rows (no episode).
    pub async fn usage_by_season(
        &self,
        series_id: DbId,
        season_number: i32,
    ) -> Result<UsageSummary, PipelineError> {
        let episode_ids = self.store.episode_ids(series_id, Some(season_number)).await?;
        let episode_rows = self.facts(UsageFilter::Episodes(episode_ids)).await?;
        let series_rows = self.facts(UsageFilter::SeriesLevel(series_id)).await?;
        Ok(summarize(&union_by_id(episode_rows, series_rows)))
    }

    async fn summarize_filter(&self, filter: UsageFilter) -> Result<UsageSummary, PipelineError> {
        Ok(summarize(&self.facts(filter).await?))
    }

    async fn facts(&self, filter: UsageFilter) -> Result<Vec<UsageFact>, PipelineError> {
        if matches!(&filter, UsageFilter::Episodes(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }
        let rows = self.store.list_usage(filter).await?;
        Ok(rows
            .iter()
            .filter_map(|row| match UsageFact::try_from(row) {
                Ok(fact) => Some(fact),
                Err(e) => {
                    tracing::warn!(usage_id = row.id, error = %e, "Skipping unreadable usage row");
                    None
                }
            })
            .collect())
    }
}

fn links_into(links: UsageLinks) -> CreateTokenUsage {
    CreateTokenUsage {
        series_id: links.series_id,
        episode_id: links.episode_id,
        segment_id: links.segment_id,
        story_id: links.story_id,
        character_id: links.character_id,
        ..Default::default()
    }
}

fn saturate(tokens: i64) -> i32 {
    i32::try_from(tokens).unwrap_or(i32::MAX)
}
