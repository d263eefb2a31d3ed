//! Standalone story generation and deletion.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use studio_core::ai_json::parse_object;
use studio_core::segment_plan::story_segment_target;
use studio_core::storage::{owner_prefix, Bucket, BucketNames};
use studio_core::styles::{ScriptStyle, VisualStyle};
use studio_core::types::DbId;
use studio_db::models::story::{CreateStory, NewStorySegment, StoryWithSegments};
use studio_db::repositories::StoryRepo;
use studio_db::DbPool;
use studio_providers::{ChatRequest, ObjectStore, TextGenerator};

use crate::activity::{ActivityTracker, STORY_GENERATION};
use crate::error::PipelineError;
use crate::prompts;
use crate::usage::{TextUsage, UsageLinks, UsageRecorder};

pub const STORY_CONTEXT: &str = "story_generation";

/// Duration target when the caller gives none.
pub const DEFAULT_STORY_DURATION: u32 = 3;

/// Seconds per segment when the model omits a duration.
const DEFAULT_STORY_SEGMENT_SECS: i32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateStory {
    pub base_idea: String,
    pub segment_count: Option<u32>,
    pub visual_style: Option<String>,
    pub script_style: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedStory {
    #[serde(default)]
    pub story_title: String,
    #[serde(default)]
    pub segments: Vec<GeneratedStorySegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedStorySegment {
    #[serde(default)]
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub visual_prompt: String,
}

/// Parse and validate a story answer.
pub fn parse_story(content: &str) -> Result<GeneratedStory, PipelineError> {
    let story: GeneratedStory = parse_object(content)
        .map_err(|e| PipelineError::MalformedResponse(format!("Failed to parse story JSON: {e}")))?;

    if story.segments.is_empty() {
        return Err(PipelineError::IncompleteGeneration(
            "Story has no segments".to_string(),
        ));
    }
    if let Some(index) = story.segments.iter().position(|s| s.text.trim().is_empty()) {
        return Err(PipelineError::IncompleteGeneration(format!(
            "Segment {index} has no narration text"
        )));
    }
    Ok(story)
}

pub struct StoryService {
    pool: DbPool,
    text: Arc<dyn TextGenerator>,
    storage: Arc<dyn ObjectStore>,
    buckets: BucketNames,
    usage: UsageRecorder,
    activity: ActivityTracker,
}

impl StoryService {
    pub fn new(
        pool: DbPool,
        text: Arc<dyn TextGenerator>,
        storage: Arc<dyn ObjectStore>,
        buckets: BucketNames,
        usage: UsageRecorder,
        activity: ActivityTracker,
    ) -> Self {
        Self {
            pool,
            text,
            storage,
            buckets,
            usage,
            activity,
        }
    }

    /// Write a story with the chat model and persist it with its segments.
    pub async fn generate_story(
        &self,
        request: GenerateStory,
    ) -> Result<StoryWithSegments, PipelineError> {
        let duration = request.segment_count.unwrap_or(DEFAULT_STORY_DURATION);
        let visual = request
            .visual_style
            .as_deref()
            .and_then(VisualStyle::parse)
            .unwrap_or_default();
        let script = request
            .script_style
            .as_deref()
            .and_then(ScriptStyle::parse)
            .unwrap_or_default();

        let handle = self
            .activity
            .start(
                STORY_GENERATION,
                None,
                json!({
                    "base_idea": request.base_idea,
                    "duration_target": duration,
                    "visual_style": visual.key(),
                    "script_style": script.key(),
                }),
            )
            .await;

        let result = self
            .write_story(&request.base_idea, duration, visual, script, handle.id)
            .await;

        match &result {
            Ok(saved) => {
                self.activity
                    .complete(
                        &handle,
                        Some(saved.story.id),
                        json!({
                            "segment_count": saved.segments.len(),
                            "story_title": saved.story.story_title,
                        }),
                    )
                    .await;
            }
            Err(e) => self.activity.fail(&handle, &e.to_string()).await,
        }
        result
    }

    async fn write_story(
        &self,
        base_idea: &str,
        duration: u32,
        visual: VisualStyle,
        script: ScriptStyle,
        generation_id: Option<DbId>,
    ) -> Result<StoryWithSegments, PipelineError> {
        let target = story_segment_target(duration);
        let request = ChatRequest::new(
            prompts::story_system(duration, target, visual.metadata(), script.metadata()),
            prompts::story_user(base_idea),
        )
        .temperature(0.7);
        let completion = self.text.chat(request).await?;
        let generated = parse_story(&completion.content)?;

        let segments: Vec<NewStorySegment> = generated
            .segments
            .into_iter()
            .map(|s| NewStorySegment {
                text: s.text,
                visual_prompt: s.visual_prompt,
                duration_seconds: s.duration_seconds.unwrap_or(DEFAULT_STORY_SEGMENT_SECS),
            })
            .collect();
        let (story, segments) = StoryRepo::create_with_segments(
            &self.pool,
            &CreateStory {
                base_idea: base_idea.to_string(),
                story_title: generated.story_title,
                visual_style: visual.key().to_string(),
                script_tone: script.key().to_string(),
            },
            &segments,
        )
        .await?;

        tracing::info!(
            story_id = story.id,
            segments = segments.len(),
            target_segments = target,
            "Story generated",
        );

        if let Some(usage) = completion.usage {
            self.usage
                .record_text_usage(TextUsage {
                    usage,
                    model: completion.model.clone(),
                    context_type: STORY_CONTEXT.to_string(),
                    links: UsageLinks::story(story.id),
                    generation_id,
                    metadata: json!({
                        "base_idea": base_idea,
                        "duration_target": duration,
                        "visual_style": visual.key(),
                        "script_style": script.key(),
                    }),
                })
                .await;
        }

        Ok(StoryWithSegments { story, segments })
    }

    /// Remove the story's stored assets, then the story row. Segments
    /// cascade. Storage failures are logged and do not block the delete.
    pub async fn delete_story(&self, story_id: DbId) -> Result<bool, PipelineError> {
        let prefix = owner_prefix(story_id);
        for bucket in Bucket::ALL {
            let name = self.buckets.name(bucket);
            match self.storage.remove_prefix(name, &prefix).await {
                Ok(removed) => {
                    tracing::debug!(story_id, bucket = name, removed, "Story assets removed");
                }
                Err(e) => {
                    tracing::warn!(story_id, bucket = name, error = %e, "Failed to remove story assets");
                }
            }
        }

        let deleted = StoryRepo::delete(&self.pool, story_id).await?;
        if deleted {
            tracing::info!(story_id, "Story deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_fenced_story() {
        let content = "Aquí está:\n```json\n{\"story_title\": \"La Llamada\", \"segments\": [\
            {\"duration_seconds\": 10, \"text\": \"Uno\", \"visual_prompt\": \"p1\"},\
            {\"text\": \"Dos\", \"visual_prompt\": \"p2\"}]}\n```";
        let story = parse_story(content).unwrap();
        assert_eq!(story.story_title, "La Llamada");
        assert_eq!(story.segments.len(), 2);
        assert_eq!(story.segments[1].duration_seconds, None);
    }

    #[test]
    fn rejects_non_json() {
        assert_matches!(
            parse_story("I cannot help with that."),
            Err(PipelineError::MalformedResponse(_))
        );
    }

    #[test]
    fn rejects_empty_or_blank_segments() {
        assert_matches!(
            parse_story("{\"story_title\": \"x\", \"segments\": []}"),
            Err(PipelineError::IncompleteGeneration(_))
        );
        assert_matches!(
            parse_story("{\"segments\": [{\"text\": \"ok\"}, {\"text\": \"  \"}]}"),
            Err(PipelineError::IncompleteGeneration(msg)) if msg.contains("Segment 1")
        );
    }
}
