use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_providers::ProviderError;

/// Errors surfaced by orchestration services and runners.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The model answered with something that is not the expected JSON.
    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    /// The JSON parsed but required content is missing.
    #[error("Incomplete generation: {0}")]
    IncompleteGeneration(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}
