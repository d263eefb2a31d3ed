//! Episode scripting: segment breakdown and continuity between episodes.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use studio_core::error::CoreError;
use studio_core::segment_plan::{episode_segment_target, DEFAULT_SEGMENT_DURATION_SECS};
use studio_core::status::{EpisodeStatus, SegmentType};
use studio_core::types::DbId;
use studio_db::models::episode::{Episode, EpisodeContinuity, EpisodeWithSegments};
use studio_db::models::segment::CreateEpisodeSegment;
use studio_db::models::story::CreateStory;
use studio_db::repositories::{CharacterRepo, EpisodeRepo, SegmentRepo, SeriesRepo};
use studio_db::DbPool;
use studio_providers::{ChatCompletion, ChatRequest, TextGenerator};

use crate::activity::{ActivityTracker, STORY_GENERATION};
use crate::chat_json::chat_json;
use crate::error::PipelineError;
use crate::prompts;
use crate::usage::{TextUsage, UsageLinks, UsageRecorder};

pub const SEGMENTS_CONTEXT: &str = "episode_segments";
pub const CONTINUITY_CONTEXT: &str = "episode_continuity";

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedEpisodeSegment {
    #[serde(default)]
    pub segment_index: Option<i32>,
    #[serde(default)]
    pub segment_type: Option<String>,
    #[serde(default)]
    pub character_focus: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub visual_prompt: String,
    #[serde(default)]
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSegments {
    #[serde(default)]
    segments: Vec<GeneratedEpisodeSegment>,
}

#[derive(Debug, Deserialize)]
struct GeneratedContinuity {
    #[serde(default)]
    previous_episode_recap: Option<String>,
    #[serde(default)]
    cliffhanger: Option<String>,
    #[serde(default)]
    next_episode_tease: Option<String>,
}

/// Turn the model's segments into rows. The model's indexes are kept only
/// when every segment has one and they are distinct and non-negative;
/// otherwise every segment is numbered by position. Unknown types become
/// `main`.
pub fn plan_segments(
    generated: Vec<GeneratedEpisodeSegment>,
) -> Result<Vec<CreateEpisodeSegment>, PipelineError> {
    if generated.is_empty() {
        return Err(PipelineError::IncompleteGeneration(
            "No segments generated".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(generated.len());
    let keep_ai_indexes = generated.iter().all(|s| {
        s.segment_index
            .is_some_and(|index| index >= 0 && seen.insert(index))
    });

    Ok(generated
        .into_iter()
        .enumerate()
        .map(|(position, s)| {
            let segment_index = match s.segment_index {
                Some(index) if keep_ai_indexes => index,
                _ => position as i32,
            };
            let segment_type = s
                .segment_type
                .as_deref()
                .and_then(|t| SegmentType::from_str(t.trim()).ok())
                .unwrap_or(SegmentType::Main);
            CreateEpisodeSegment {
                segment_index,
                segment_type: segment_type.as_str().to_string(),
                character_focus: s.character_focus.filter(|c| !c.trim().is_empty()),
                text: s.text,
                visual_prompt: s.visual_prompt,
                duration_seconds: s
                    .duration_seconds
                    .filter(|d| *d > 0)
                    .unwrap_or(DEFAULT_SEGMENT_DURATION_SECS),
            }
        })
        .collect())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn into_continuity(generated: GeneratedContinuity) -> Result<EpisodeContinuity, PipelineError> {
    let recap = non_empty(generated.previous_episode_recap).ok_or_else(|| {
        PipelineError::IncompleteGeneration("Continuity is missing previous_episode_recap".into())
    })?;
    Ok(EpisodeContinuity {
        previous_episode_recap: recap,
        cliffhanger: non_empty(generated.cliffhanger),
        next_episode_tease: non_empty(generated.next_episode_tease),
    })
}

pub struct EpisodeService {
    pool: DbPool,
    text: Arc<dyn TextGenerator>,
    usage: UsageRecorder,
    activity: ActivityTracker,
}

impl EpisodeService {
    pub fn new(
        pool: DbPool,
        text: Arc<dyn TextGenerator>,
        usage: UsageRecorder,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            pool,
            text,
            usage,
            activity,
        }
    }

    /// Break an episode into segments, persist them behind a backing story
    /// and move the episode to `segments_ready`.
    pub async fn generate_segments(
        &self,
        episode_id: DbId,
    ) -> Result<EpisodeWithSegments, PipelineError> {
        let episode = EpisodeRepo::find_by_id(&self.pool, episode_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("episode", episode_id))?;

        let handle = self
            .activity
            .start(
                STORY_GENERATION,
                None,
                json!({
                    "episode_id": episode_id,
                    "series_id": episode.series_id,
                    "target_duration": episode.target_duration,
                }),
            )
            .await;

        match self.write_segments(episode, handle.id).await {
            Ok(saved) => {
                let story_id = saved.segments.first().and_then(|s| s.story_id);
                self.activity
                    .complete(
                        &handle,
                        story_id,
                        json!({ "episode_id": episode_id, "segment_count": saved.segments.len() }),
                    )
                    .await;
                Ok(saved)
            }
            Err(e) => {
                self.activity.fail(&handle, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn write_segments(
        &self,
        episode: Episode,
        generation_id: Option<DbId>,
    ) -> Result<EpisodeWithSegments, PipelineError> {
        let series = SeriesRepo::find_by_id(&self.pool, episode.series_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("series", episode.series_id))?;
        let characters = CharacterRepo::list_for_series(&self.pool, series.id).await?;

        let segment_count = episode_segment_target(Some(episode.target_duration));
        let request = ChatRequest::new(
            prompts::episode_segments_system(
                segment_count,
                prompts::visual_meta(&series.visual_style),
                prompts::script_meta(&series.script_style),
            ),
            prompts::episode_segments_user(
                &series,
                &episode,
                &characters,
                segment_count,
                episode.target_duration,
            ),
        )
        .temperature(0.7)
        .max_tokens(4000);

        let (generated, completion): (GeneratedSegments, _) =
            chat_json(self.text.as_ref(), request, "episode segments").await?;
        let rows = plan_segments(generated.segments)?;

        let (story, segments) = SegmentRepo::create_for_episode(
            &self.pool,
            episode.id,
            &CreateStory {
                base_idea: episode.synopsis.clone(),
                story_title: episode.title.clone(),
                visual_style: series.visual_style.clone(),
                script_tone: series.script_style.clone(),
            },
            &rows,
        )
        .await?;

        let episode = EpisodeRepo::set_status(&self.pool, episode.id, EpisodeStatus::SegmentsReady)
            .await?
            .ok_or_else(|| PipelineError::not_found("episode", episode.id))?;

        tracing::info!(
            episode_id = episode.id,
            story_id = story.id,
            segments = segments.len(),
            requested = segment_count,
            "Episode segments generated",
        );

        self.record(
            &completion,
            SEGMENTS_CONTEXT,
            UsageLinks::episode(episode.series_id, episode.id),
            generation_id,
            json!({ "segment_count": segments.len(), "backing_story_id": story.id }),
        )
        .await;

        Ok(EpisodeWithSegments { episode, segments })
    }

    /// Write the recap, cliffhanger and teaser for an episode from the
    /// previous episode of the same season.
    pub async fn generate_continuity(&self, episode_id: DbId) -> Result<Episode, PipelineError> {
        let episode = EpisodeRepo::find_by_id(&self.pool, episode_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("episode", episode_id))?;
        let previous = EpisodeRepo::find_previous(&self.pool, &episode)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Episode {} of season {} has no previous episode",
                    episode.episode_number, episode.season_number
                ))
            })?;
        let series = SeriesRepo::find_by_id(&self.pool, episode.series_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("series", episode.series_id))?;
        let segments = SegmentRepo::list_for_episode(&self.pool, previous.id).await?;

        let request = ChatRequest::new(
            prompts::continuity_system(prompts::script_meta(&series.script_style)),
            prompts::continuity_user(&series.title, &previous, &segments),
        )
        .temperature(0.7)
        .max_tokens(1000);

        let (generated, completion): (GeneratedContinuity, _) =
            chat_json(self.text.as_ref(), request, "continuity").await?;
        let continuity = into_continuity(generated)?;

        let updated = EpisodeRepo::set_continuity(&self.pool, episode.id, &continuity)
            .await?
            .ok_or_else(|| PipelineError::not_found("episode", episode.id))?;

        tracing::info!(
            episode_id = episode.id,
            previous_episode_id = previous.id,
            has_cliffhanger = continuity.cliffhanger.is_some(),
            "Episode continuity generated",
        );

        self.record(
            &completion,
            CONTINUITY_CONTEXT,
            UsageLinks::episode(episode.series_id, episode.id),
            None,
            json!({ "previous_episode_id": previous.id }),
        )
        .await;

        Ok(updated)
    }

    async fn record(
        &self,
        completion: &ChatCompletion,
        context: &str,
        links: UsageLinks,
        generation_id: Option<DbId>,
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
                generation_id,
                metadata,
            })
            .await;
    }
}
