use serde::de::DeserializeOwned;
use studio_core::ai_json::parse_object;
use studio_providers::{ChatCompletion, ChatRequest, TextGenerator};

use crate::error::PipelineError;

/// Run a chat request and decode the JSON object in its answer.
///
/// `what` names the expected document in the error message.
pub(crate) async fn chat_json<T: DeserializeOwned>(
    text: &dyn TextGenerator,
    request: ChatRequest,
    what: &str,
) -> Result<(T, ChatCompletion), PipelineError> {
    let completion = text.chat(request).await?;
    let value = parse_object(&completion.content).map_err(|e| {
        tracing::warn!(
            document = what,
            preview = %completion.content.chars().take(200).collect::<String>(),
            "Unparseable AI response",
        );
        PipelineError::MalformedResponse(format!("Failed to parse {what} JSON: {e}"))
    })?;
    Ok((value, completion))
}
