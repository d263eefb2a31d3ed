//! Text-to-image via the DashScope async image-synthesis task API.

use async_trait::async_trait;
use serde_json::json;
use studio_core::retry::{PollPolicy, RetryPolicy};
use studio_core::styles::describe_visual_style;

use crate::error::ProviderError;
use crate::http::{join, parse_response};
use crate::retry::with_retry;
use crate::task::{TaskEnvelope, STATUS_FAILED, STATUS_SUCCEEDED};
use crate::traits::ImageGenerator;

pub const IMAGE_MODEL: &str = "qwen-image-plus";

/// Portrait frame used for every segment image.
pub const IMAGE_SIZE: &str = "928*1664";

/// Prompt sent to the provider: the segment prompt plus the style description.
pub fn styled_prompt(prompt: &str, style: &str) -> String {
    format!(
        "{prompt}. Style: {}. High quality, detailed cinematic render.",
        describe_visual_style(style)
    )
}

pub struct DashScopeImageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    poll: PollPolicy,
    retry: RetryPolicy,
}

impl DashScopeImageClient {
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
            poll: PollPolicy::image(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn submit(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = join(&self.base_url, "services/aigc/text2image/image-synthesis");
        let body = json!({
            "model": IMAGE_MODEL,
            "input": { "prompt": prompt },
            "parameters": { "style": "<auto>", "size": IMAGE_SIZE, "n": 1 },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&body)
            .send()
            .await?;
        let envelope: TaskEnvelope = parse_response(response).await?;
        envelope.task_id()
    }

    async fn poll(&self, task_id: &str) -> Result<String, ProviderError> {
        let url = join(&self.base_url, &format!("tasks/{task_id}"));
        let mut attempts = 0u32;

        loop {
            if let Some(max) = self.poll.max_attempts {
                if attempts >= max {
                    return Err(ProviderError::GenerationTimeout { attempts: max });
                }
            }
            tokio::time::sleep(self.poll.interval).await;
            attempts += 1;

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let envelope: TaskEnvelope = parse_response(response).await?;

            match envelope.status() {
                STATUS_SUCCEEDED => {
                    return envelope
                        .into_output()
                        .results
                        .into_iter()
                        .next()
                        .and_then(|r| r.url)
                        .ok_or_else(|| {
                            ProviderError::MalformedResponse(
                                "Image task succeeded without a result URL".to_string(),
                            )
                        });
                }
                STATUS_FAILED => {
                    return Err(ProviderError::GenerationFailed(
                        "Image generation task failed".to_string(),
                    ));
                }
                status => {
                    tracing::trace!(task_id, status, attempts, "Image task pending");
                }
            }
        }
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let task_id = self.submit(prompt).await?;
        tracing::debug!(task_id = %task_id, "Image task submitted");
        self.poll(&task_id).await.inspect_err(|e| {
            tracing::warn!(task_id = %task_id, error = %e, "Image task abandoned");
        })
    }
}

#[async_trait]
impl ImageGenerator for DashScopeImageClient {
    async fn generate_image(&self, prompt: &str, style: &str) -> Result<String, ProviderError> {
        let styled = styled_prompt(prompt, style);
        let styled = styled.as_str();
        with_retry(&self.retry, "image_generation", move || self.generate_once(styled)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styled_prompt_uses_catalog_description() {
        let prompt = styled_prompt("A lighthouse", "anime");
        assert!(prompt.starts_with("A lighthouse. Style: "));
        assert!(prompt.ends_with(". High quality, detailed cinematic render."));
        assert!(!prompt.contains("Style: anime."));
    }

    #[test]
    fn unknown_style_is_used_verbatim() {
        assert_eq!(
            styled_prompt("A cat", "oil on velvet"),
            "A cat. Style: oil on velvet. High quality, detailed cinematic render."
        );
    }
}
