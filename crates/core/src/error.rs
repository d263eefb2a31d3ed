use crate::types::DbId;

/// Domain-level error shared by every studio crate.
///
/// Layer-specific errors (provider, pipeline, HTTP) wrap this type rather
/// than re-declaring the same variants.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
