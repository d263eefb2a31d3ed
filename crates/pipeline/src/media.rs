//! Image and narration generation with usage attribution.

use std::sync::Arc;

use serde_json::json;
use studio_core::status::GenerationType;
use studio_providers::image::IMAGE_MODEL;
use studio_providers::speech::{SPEECH_MODEL, SPEECH_VOICE};
use studio_providers::{ImageGenerator, SpeechGenerator};

use crate::error::PipelineError;
use crate::usage::{MediaUsage, UsageLinks, UsageRecorder};

pub const IMAGE_CONTEXT: &str = "image_generation";
pub const AUDIO_CONTEXT: &str = "audio_generation";

pub struct MediaService {
    images: Arc<dyn ImageGenerator>,
    speech: Arc<dyn SpeechGenerator>,
    usage: UsageRecorder,
}

impl MediaService {
    pub fn new(
        images: Arc<dyn ImageGenerator>,
        speech: Arc<dyn SpeechGenerator>,
        usage: UsageRecorder,
    ) -> Self {
        Self {
            images,
            speech,
            usage,
        }
    }

    /// Generate an image and return the provider URL. `context` overrides the
    /// usage context (e.g. `"character_poster"`).
    pub async fn generate_image(
        &self,
        prompt: &str,
        style: &str,
        context: Option<&str>,
        links: UsageLinks,
    ) -> Result<String, PipelineError> {
        let url = self.images.generate_image(prompt, style).await?;

        self.usage
            .record_media_usage(MediaUsage {
                generation_type: GenerationType::Image,
                model: IMAGE_MODEL.to_string(),
                context_type: context.unwrap_or(IMAGE_CONTEXT).to_string(),
                links,
                metadata: json!({
                    "prompt_length": prompt.chars().count(),
                    "style": style,
                }),
            })
            .await;

        Ok(url)
    }

    pub async fn generate_audio(
        &self,
        text: &str,
        context: Option<&str>,
        links: UsageLinks,
    ) -> Result<String, PipelineError> {
        let url = self.speech.generate_audio(text).await?;

        self.usage
            .record_media_usage(MediaUsage {
                generation_type: GenerationType::Audio,
                model: SPEECH_MODEL.to_string(),
                context_type: context.unwrap_or(AUDIO_CONTEXT).to_string(),
                links,
                metadata: json!({
                    "text_length": text.chars().count(),
                    "voice": SPEECH_VOICE,
                }),
            })
            .await;

        Ok(url)
    }
}
