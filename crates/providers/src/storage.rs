//! Supabase Storage over its REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::ProviderError;
use crate::http::{ensure_success, join, parse_response, read_bytes};
use crate::traits::ObjectStore;

/// Page size for prefix listings.
const LIST_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

pub struct SupabaseStorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl SupabaseStorageClient {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, service_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        service_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        join(&self.base_url, &format!("storage/v1/object/public/{bucket}/{key}"))
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }

    fn storage_error(bucket: &str, e: ProviderError) -> ProviderError {
        match e {
            ProviderError::Http { status, body } => {
                ProviderError::Storage(format!("bucket {bucket}: HTTP {status}: {body}"))
            }
            other => other,
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorageClient {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ProviderError> {
        let url = join(&self.base_url, &format!("storage/v1/object/{bucket}/{key}"));
        let size = bytes.len();
        let response = self
            .authed(self.client.post(&url))
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        ensure_success(response)
            .await
            .map_err(|e| Self::storage_error(bucket, e))?;

        tracing::debug!(bucket, key, size, "Object uploaded");
        Ok(self.public_url(bucket, key))
    }

    async fn remove_prefix(&self, bucket: &str, prefix: &str) -> Result<usize, ProviderError> {
        let list_url = join(&self.base_url, &format!("storage/v1/object/list/{bucket}"));
        let response = self
            .authed(self.client.post(&list_url))
            .json(&json!({ "prefix": prefix, "limit": LIST_LIMIT }))
            .send()
            .await?;
        let listed: Vec<ListedObject> = parse_response(response)
            .await
            .map_err(|e| Self::storage_error(bucket, e))?;

        if listed.is_empty() {
            return Ok(0);
        }

        let folder = if prefix.ends_with('/') || prefix.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        let paths: Vec<String> = listed
            .into_iter()
            .map(|object| format!("{folder}{}", object.name))
            .collect();
        let removed = paths.len();

        let delete_url = join(&self.base_url, &format!("storage/v1/object/{bucket}"));
        let response = self
            .authed(self.client.delete(&delete_url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        ensure_success(response)
            .await
            .map_err(|e| Self::storage_error(bucket, e))?;

        tracing::info!(bucket, prefix, removed, "Objects removed");
        Ok(removed)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(url).send().await?;
        read_bytes(response).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn public_url_layout() {
        let client = SupabaseStorageClient::new("https://proj.supabase.co/", "key");
        assert_eq!(
            client.public_url("story-images", "12/segment_0_1.png"),
            "https://proj.supabase.co/storage/v1/object/public/story-images/12/segment_0_1.png"
        );
    }

    #[test]
    fn http_failures_become_storage_errors() {
        let mapped = SupabaseStorageClient::storage_error(
            "story-audios",
            ProviderError::Http {
                status: 403,
                body: "denied".to_string(),
            },
        );
        assert_matches!(mapped, ProviderError::Storage(msg) if msg.contains("story-audios") && msg.contains("403"));
    }
}
