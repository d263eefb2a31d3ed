//! HTTP clients for the generation and storage providers.
//!
//! Each client wraps a [`reqwest::Client`] plus a base URL and implements
//! one of the traits in [`traits`]; orchestration code depends on the traits
//! only.

pub mod chat;
pub mod clipcraft;
pub mod error;
mod http;
pub mod image;
pub mod retry;
pub mod speech;
pub mod storage;
mod task;
pub mod traits;
pub mod wan;

pub use chat::{ChatCompletion, ChatMessage, ChatRequest, ChatUsage, DashScopeChatClient};
pub use clipcraft::{ClipCraftClient, RenderJobStatus, RenderSegment, RenderStatus};
pub use error::ProviderError;
pub use image::DashScopeImageClient;
pub use speech::DashScopeSpeechClient;
pub use storage::SupabaseStorageClient;
pub use traits::{
    ImageGenerator, ObjectStore, SpeechGenerator, TextGenerator, VideoRenderer, VideoSynthesizer,
};
pub use wan::{WanClient, WanRequest, WanTaskStatus};
