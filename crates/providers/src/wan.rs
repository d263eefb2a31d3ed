//! Wan text-to-video synthesis. Submission returns a task id; callers poll
//! [`VideoSynthesizer::task_status`] on their own schedule.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::error::ProviderError;
use crate::http::{join, parse_response};
use crate::task::{TaskEnvelope, STATUS_FAILED, STATUS_SUCCEEDED};
use crate::traits::VideoSynthesizer;

pub const WAN_MODEL: &str = "wan2.5-t2v-preview";
pub const DEFAULT_WAN_DURATION: u32 = 5;
pub const DEFAULT_WAN_SIZE: &str = "720*1280";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WanRequest {
    pub prompt: String,
    pub audio_url: Option<String>,
    pub duration: u32,
    pub size: String,
}

impl WanRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            audio_url: None,
            duration: DEFAULT_WAN_DURATION,
            size: DEFAULT_WAN_SIZE.to_string(),
        }
    }

    pub fn audio_url(mut self, url: Option<String>) -> Self {
        self.audio_url = url;
        self
    }

    pub fn duration(mut self, seconds: u32) -> Self {
        self.duration = seconds;
        self
    }

    fn body(&self) -> serde_json::Value {
        let mut input = json!({ "prompt": self.prompt });
        if let Some(url) = &self.audio_url {
            input["audio_url"] = json!(url);
        }
        json!({
            "model": WAN_MODEL,
            "input": input,
            "parameters": {
                "duration": self.duration,
                "size": self.size,
                "prompt_extend": true,
                "audio": true,
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WanTaskStatus {
    Pending,
    Completed { video_url: String },
    Failed { message: String },
}

impl WanTaskStatus {
    fn from_envelope(envelope: TaskEnvelope) -> Result<Self, ProviderError> {
        let status = envelope.status().to_string();
        let output = envelope.into_output();
        match status.as_str() {
            STATUS_SUCCEEDED => output
                .video_url
                .map(|video_url| Self::Completed { video_url })
                .ok_or_else(|| {
                    ProviderError::MalformedResponse(
                        "Video task succeeded without a video URL".to_string(),
                    )
                }),
            STATUS_FAILED => Ok(Self::Failed {
                message: output
                    .message
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
            _ => Ok(Self::Pending),
        }
    }
}

pub struct WanClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WanClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl VideoSynthesizer for WanClient {
    async fn submit(&self, request: &WanRequest) -> Result<String, ProviderError> {
        let url = join(&self.base_url, "services/aigc/video-generation/video-synthesis");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&request.body())
            .send()
            .await?;
        let envelope: TaskEnvelope = parse_response(response).await?;
        let task_id = envelope.task_id()?;
        tracing::info!(task_id = %task_id, duration = request.duration, "Wan task submitted");
        Ok(task_id)
    }

    async fn task_status(&self, task_id: &str) -> Result<WanTaskStatus, ProviderError> {
        let url = join(&self.base_url, &format!("tasks/{task_id}"));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: TaskEnvelope = parse_response(response).await?;
        WanTaskStatus::from_envelope(envelope)
    }
}
