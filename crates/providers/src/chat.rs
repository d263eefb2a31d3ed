//! OpenAI-compatible chat completions against DashScope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::http::{join, parse_response};
use crate::traits::TextGenerator;

/// Default chat model.
pub const CHAT_MODEL: &str = "qwen-plus";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl ChatRequest {
    /// A system + user exchange on the default model at temperature 0.8.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: CHAT_MODEL.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.8,
            max_tokens: None,
            top_p: None,
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Token counts reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<ChatUsage>,
    pub finish_reason: Option<String>,
    /// Model that served the request, as echoed by the provider.
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct RawCompletion {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: Option<String>,
}

impl RawCompletion {
    fn into_completion(self, requested_model: &str) -> Result<ChatCompletion, ProviderError> {
        let choice = self.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("No content received".to_string()))?;

        Ok(ChatCompletion {
            content,
            usage: self.usage,
            finish_reason,
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat client for the DashScope compatible-mode endpoint.
pub struct DashScopeChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DashScopeChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client that shares an existing connection pool.
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
impl TextGenerator for DashScopeChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError> {
        let url = join(&self.base_url, "chat/completions");
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Chat request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let raw: RawCompletion = parse_response(response).await?;
        let completion = raw.into_completion(&request.model)?;

        tracing::debug!(
            model = %completion.model,
            finish_reason = completion.finish_reason.as_deref().unwrap_or("unknown"),
            total_tokens = completion.usage.map(|u| u.total_tokens).unwrap_or(0),
            "Chat completion received",
        );
        Ok(completion)
    }
}
