//! Aggregation of `token_usage` facts.
//!
//! Rows are append-only; every summary is computed on read from the subset
//! of facts linked to an entity.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::status::GenerationType;
use crate::types::DbId;

/// Provider recorded on every fact; all models are DashScope-hosted Qwen.
pub const USAGE_PROVIDER: &str = "qwen";

/// Context bucket for facts recorded without one.
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// The columns of a usage row that summaries read.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageFact {
    pub id: DbId,
    pub generation_type: GenerationType,
    pub model_used: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub context_type: Option<String>,
    pub estimated_cost_usd: Option<f64>,
}

/// Token and call counts for one model or context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelUsage {
    pub tokens: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_tokens: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub text_generations: i64,
    pub image_generations: i64,
    pub audio_generations: i64,
    pub video_generations: i64,
    pub total_generations: i64,
    /// Present only when at least one fact carried a cost.
    pub estimated_cost_usd: Option<f64>,
    pub by_model: BTreeMap<String, ModelUsage>,
    pub by_context: BTreeMap<String, ModelUsage>,
}

/// Fold facts into a summary.
pub fn summarize<'a, I>(facts: I) -> UsageSummary
where
    I: IntoIterator<Item = &'a UsageFact>,
{
    let mut summary = UsageSummary::default();

    for fact in facts {
        summary.total_tokens += fact.total_tokens;
        summary.prompt_tokens += fact.prompt_tokens;
        summary.completion_tokens += fact.completion_tokens;
        summary.total_generations += 1;

        match fact.generation_type {
            GenerationType::Text => summary.text_generations += 1,
            GenerationType::Image => summary.image_generations += 1,
            GenerationType::Audio => summary.audio_generations += 1,
            GenerationType::Video => summary.video_generations += 1,
        }

        if let Some(cost) = fact.estimated_cost_usd {
            *summary.estimated_cost_usd.get_or_insert(0.0) += cost;
        }

        let model = summary.by_model.entry(fact.model_used.clone()).or_default();
        model.tokens += fact.total_tokens;
        model.count += 1;

        let context_key = fact
            .context_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_CONTEXT.to_string());
        let context = summary.by_context.entry(context_key).or_default();
        context.tokens += fact.total_tokens;
        context.count += 1;
    }

    summary
}

/// Merge two fact lists, keeping the first occurrence of each id.
pub fn union_by_id(primary: Vec<UsageFact>, secondary: Vec<UsageFact>) -> Vec<UsageFact> {
    let mut seen = std::collections::HashSet::new();
    primary
        .into_iter()
        .chain(secondary)
        .filter(|fact| seen.insert(fact.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(id: DbId, kind: GenerationType, model: &str, tokens: i64, context: Option<&str>) -> UsageFact {
        UsageFact {
            id,
            generation_type: kind,
            model_used: model.to_string(),
            prompt_tokens: tokens / 2,
            completion_tokens: tokens - tokens / 2,
            total_tokens: tokens,
            context_type: context.map(String::from),
            estimated_cost_usd: None,
        }
    }

    #[test]
    fn empty_summary() {
        let summary = summarize(&Vec::<UsageFact>::new());
        assert_eq!(summary.total_generations, 0);
        assert_eq!(summary.estimated_cost_usd, None);
        assert!(summary.by_model.is_empty());
    }

    #[test]
    fn counts_by_type_model_and_context() {
        let facts = vec![
            fact(1, GenerationType::Text, "qwen-plus", 1200, Some("story_generation")),
            fact(2, GenerationType::Image, "qwen-image-plus", 0, Some("image_generation")),
            fact(3, GenerationType::Image, "qwen-image-plus", 0, Some("image_generation")),
            fact(4, GenerationType::Audio, "qwen3-tts-flash", 0, None),
        ];
        let summary = summarize(&facts);

        assert_eq!(summary.total_tokens, 1200);
        assert_eq!(summary.prompt_tokens, 600);
        assert_eq!(summary.completion_tokens, 600);
        assert_eq!(summary.text_generations, 1);
        assert_eq!(summary.image_generations, 2);
        assert_eq!(summary.audio_generations, 1);
        assert_eq!(summary.video_generations, 0);
        assert_eq!(summary.total_generations, 4);
        assert_eq!(
            summary.by_model["qwen-image-plus"],
            ModelUsage { tokens: 0, count: 2 }
        );
        assert_eq!(
            summary.by_context["story_generation"],
            ModelUsage { tokens: 1200, count: 1 }
        );
        assert_eq!(summary.by_context[UNKNOWN_CONTEXT].count, 1);
    }

    #[test]
    fn cost_is_present_only_when_recorded() {
        let mut priced = fact(1, GenerationType::Text, "qwen-plus", 10, None);
        priced.estimated_cost_usd = Some(0.25);
        let unpriced = fact(2, GenerationType::Text, "qwen-plus", 10, None);

        let summary = summarize(&[priced.clone(), unpriced.clone()]);
        assert_eq!(summary.estimated_cost_usd, Some(0.25));

        let summary = summarize(&[unpriced]);
        assert_eq!(summary.estimated_cost_usd, None);
    }

    #[test]
    fn union_drops_duplicate_ids() {
        let a = vec![fact(1, GenerationType::Text, "m", 5, None), fact(2, GenerationType::Text, "m", 5, None)];
        let b = vec![fact(2, GenerationType::Text, "m", 5, None), fact(3, GenerationType::Image, "m", 0, None)];
        let merged = union_by_id(a, b);
        assert_eq!(merged.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(summarize(&merged).total_tokens, 10);
    }
}
