//! Text-to-speech via DashScope multimodal generation. The call is
//! synchronous: the audio URL comes back in the response body.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use studio_core::retry::RetryPolicy;

use crate::error::ProviderError;
use crate::http::{join, parse_response};
use crate::retry::with_retry;
use crate::traits::SpeechGenerator;

pub const SPEECH_MODEL: &str = "qwen3-tts-flash";
pub const SPEECH_VOICE: &str = "Lucia";

#[derive(Debug, Default, Deserialize)]
struct SpeechResponse {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    output: Option<SpeechOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechOutput {
    #[serde(default)]
    audio: Option<SpeechAudio>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpeechAudio {
    #[serde(default)]
    url: Option<String>,
}

impl SpeechResponse {
    /// Success codes arrive as either the number 200 or the string "200".
    fn has_error_code(&self) -> bool {
        match &self.code {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Number(n)) => n.as_u64() != Some(200),
            Some(serde_json::Value::String(s)) => s != "200",
            Some(_) => true,
        }
    }

    fn into_audio_url(self) -> Result<String, ProviderError> {
        if self.has_error_code() {
            return Err(ProviderError::GenerationFailed(
                self.message
                    .unwrap_or_else(|| "Audio generation failed".to_string()),
            ));
        }
        let output = self.output.unwrap_or_default();
        output
            .audio
            .and_then(|a| a.url)
            .or(output.audio_url)
            .or(output.url)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("No audio URL in response".to_string())
            })
    }
}

pub struct DashScopeSpeechClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl DashScopeSpeechClient {
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
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn generate_once(&self, text: &str) -> Result<String, ProviderError> {
        let url = join(&self.base_url, "services/aigc/multimodal-generation/generation");
        let body = json!({
            "model": SPEECH_MODEL,
            "input": { "text": text },
            "parameters": {
                "voice": SPEECH_VOICE,
                "format": "mp3",
                "sample_rate": 24000,
                "volume": 50,
                "rate": 1.0,
                "pitch": 1.0,
            },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: SpeechResponse = parse_response(response).await?;
        parsed.into_audio_url()
    }
}

#[async_trait]
impl SpeechGenerator for DashScopeSpeechClient {
    async fn generate_audio(&self, text: &str) -> Result<String, ProviderError> {
        with_retry(&self.retry, "audio_generation", move || self.generate_once(text)).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<String, ProviderError> {
        serde_json::from_value::<SpeechResponse>(value)
            .unwrap()
            .into_audio_url()
    }

    #[test]
    fn audio_url_fallback_order() {
        assert_eq!(
            parse(json!({"output": {"audio": {"url": "a"}, "audio_url": "b", "url": "c"}})).unwrap(),
            "a"
        );
        assert_eq!(parse(json!({"output": {"audio_url": "b", "url": "c"}})).unwrap(), "b");
        assert_eq!(parse(json!({"output": {"url": "c"}})).unwrap(), "c");
    }

    #[test]
    fn success_codes_in_either_form() {
        assert!(parse(json!({"code": 200, "output": {"url": "u"}})).is_ok());
        assert!(parse(json!({"code": "200", "output": {"url": "u"}})).is_ok());
    }

    #[test]
    fn error_code_surfaces_provider_message() {
        assert_matches!(
            parse(json!({"code": "InvalidParameter", "message": "text too long"})),
            Err(ProviderError::GenerationFailed(msg)) if msg == "text too long"
        );
    }

    #[test]
    fn missing_url_is_malformed() {
        assert_matches!(
            parse(json!({"output": {}})),
            Err(ProviderError::MalformedResponse(_))
        );
    }
}
