//! Response helpers shared by every client.

use serde::de::DeserializeOwned;

use crate::error::ProviderError;

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or [`ProviderError::Http`] with the status and body
/// text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
pub(crate) async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let response = ensure_success(response).await?;
    Ok(response.json::<T>().await?)
}

/// Read a successful response body as raw bytes.
pub(crate) async fn read_bytes(response: reqwest::Response) -> Result<Vec<u8>, ProviderError> {
    let response = ensure_success(response).await?;
    Ok(response.bytes().await?.to_vec())
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_normalises_slashes() {
        assert_eq!(join("http://h/api/v1/", "/tasks/1"), "http://h/api/v1/tasks/1");
        assert_eq!(join("http://h", "generate"), "http://h/generate");
    }
}
