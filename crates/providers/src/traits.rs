//! Provider seams. The pipeline holds these as `Arc<dyn Trait>` so tests can
//! substitute in-memory fakes.

use async_trait::async_trait;

use crate::chat::{ChatCompletion, ChatRequest};
use crate::clipcraft::{RenderSegment, RenderStatus};
use crate::error::ProviderError;
use crate::wan::{WanRequest, WanTaskStatus};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, ProviderError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image and return the provider-hosted URL.
    async fn generate_image(&self, prompt: &str, style: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// Narrate `text` and return the provider-hosted audio URL.
    async fn generate_audio(&self, text: &str) -> Result<String, ProviderError>;
}

#[async_trait]
pub trait VideoSynthesizer: Send + Sync {
    async fn submit(&self, request: &WanRequest) -> Result<String, ProviderError>;
    async fn task_status(&self, task_id: &str) -> Result<WanTaskStatus, ProviderError>;
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn submit(&self, segments: &[RenderSegment]) -> Result<String, ProviderError>;
    async fn status(&self, job_id: &str) -> Result<RenderStatus, ProviderError>;
    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload (upserting) and return the public URL of the object.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ProviderError>;

    /// Remove every object under `prefix`. Returns the number removed.
    async fn remove_prefix(&self, bucket: &str, prefix: &str) -> Result<usize, ProviderError>;

    /// Download a remote asset, typically a provider-hosted URL.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}
