//! ClipCraft renderer: assembles segment images and narration into a single
//! captioned video.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use studio_core::render_progress::RenderProgress;
use studio_core::types::DbId;

use crate::error::ProviderError;
use crate::http::{join, parse_response, read_bytes};
use crate::traits::VideoRenderer;

pub const OPENING_TEXT: &str = "😱 WAIT FOR IT...";

/// One segment as the renderer expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSegment {
    pub id: DbId,
    pub story_id: DbId,
    pub segment_index: i32,
    pub text: String,
    pub image_url: String,
    pub audio_url: String,
    pub duration_seconds: i32,
    pub visual_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderJobStatus {
    Pending,
    Completed,
    Failed,
    /// Unrecognised states are treated as still in progress.
    #[serde(other)]
    Processing,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderStatus {
    pub status: RenderJobStatus,
    #[serde(default)]
    pub progress: Option<RenderProgress>,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    job_id: Option<String>,
}

fn render_payload(segments: &[RenderSegment]) -> serde_json::Value {
    json!({
        "segments": segments,
        "story_beats": null,
        "add_opening_card": true,
        "opening_text": OPENING_TEXT,
        "show_progress": true,
        "enable_karaoke_subs": true,
        "subtitle_style": "bold",
        "language": "es",
    })
}

pub struct ClipCraftClient {
    client: reqwest::Client,
    base_url: String,
}

impl ClipCraftClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Relative output paths are served by the renderer itself.
    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            join(&self.base_url, url)
        }
    }
}

#[async_trait]
impl VideoRenderer for ClipCraftClient {
    async fn submit(&self, segments: &[RenderSegment]) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(join(&self.base_url, "generate"))
            .json(&render_payload(segments))
            .send()
            .await?;
        let parsed: SubmitResponse = parse_response(response).await?;
        parsed
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("No job ID received".to_string()))
    }

    async fn status(&self, job_id: &str) -> Result<RenderStatus, ProviderError> {
        let response = self
            .client
            .get(join(&self.base_url, &format!("status/{job_id}")))
            .send()
            .await?;
        parse_response(response).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(self.resolve(url)).send().await?;
        read_bytes(response).await
    }
}
