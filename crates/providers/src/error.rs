/// Errors from the provider client layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Http {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response lacked a field the caller needs.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The provider accepted the task and later reported failure.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Polling gave up before the task reached a terminal state.
    #[error("Generation timed out after {attempts} polls")]
    GenerationTimeout { attempts: u32 },

    /// Object storage rejected an operation.
    #[error("Storage error: {0}")]
    Storage(String),
}
