use std::str::FromStr;

use anyhow::Context;
use studio_core::storage::{
    BucketNames, DEFAULT_AUDIO_BUCKET, DEFAULT_IMAGES_BUCKET, DEFAULT_VIDEO_BUCKET,
};

const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/api/v1";
const DEFAULT_DASHSCOPE_CHAT_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";
const DEFAULT_CLIPCRAFT_URL: &str = "https://apiclipcraft.sonorodigital.com.mx";

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except
/// `DATABASE_URL`, which `main` reads separately.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `180`).
    pub request_timeout_secs: u64,
    /// Grace period for background tasks after the listener closes.
    pub shutdown_timeout_secs: u64,
    pub providers: ProviderConfig,
}

/// Credentials and base URLs of the generation and storage providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub dashscope_api_key: String,
    pub dashscope_base_url: String,
    pub dashscope_chat_url: String,
    pub clipcraft_url: String,
    pub storage_url: String,
    pub storage_service_key: String,
    pub buckets: BucketNames,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                                   |
    /// |-------------------------|-----------------------------------------------------------|
    /// | `HOST`                  | `0.0.0.0`                                                 |
    /// | `PORT`                  | `3000`                                                    |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`                                   |
    /// | `REQUEST_TIMEOUT_SECS`  | `180`                                                     |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                                                      |
    /// | `DASHSCOPE_API_KEY`     | empty                                                     |
    /// | `DASHSCOPE_BASE_URL`    | `https://dashscope-intl.aliyuncs.com/api/v1`              |
    /// | `DASHSCOPE_CHAT_URL`    | `https://dashscope-intl.aliyuncs.com/compatible-mode/v1`  |
    /// | `CLIPCRAFT_URL`         | `https://apiclipcraft.sonorodigital.com.mx`               |
    /// | `STORAGE_URL`           | empty                                                     |
    /// | `STORAGE_SERVICE_KEY`   | empty                                                     |
    /// | `STORAGE_IMAGES_BUCKET` | `story-images`                                            |
    /// | `STORAGE_AUDIO_BUCKET`  | `story-audios`                                            |
    /// | `STORAGE_VIDEO_BUCKET`  | `story-videos`                                            |
    pub fn from_env() -> anyhow::Result<Self> {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 180)?,
            shutdown_timeout_secs: parse_env("SHUTDOWN_TIMEOUT_SECS", 30)?,
            providers: ProviderConfig::from_env(),
        })
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self {
            dashscope_api_key: env_or("DASHSCOPE_API_KEY", ""),
            dashscope_base_url: env_or("DASHSCOPE_BASE_URL", DEFAULT_DASHSCOPE_BASE_URL),
            dashscope_chat_url: env_or("DASHSCOPE_CHAT_URL", DEFAULT_DASHSCOPE_CHAT_URL),
            clipcraft_url: env_or("CLIPCRAFT_URL", DEFAULT_CLIPCRAFT_URL),
            storage_url: env_or("STORAGE_URL", ""),
            storage_service_key: env_or("STORAGE_SERVICE_KEY", ""),
            buckets: BucketNames {
                images: env_or("STORAGE_IMAGES_BUCKET", DEFAULT_IMAGES_BUCKET),
                audio: env_or("STORAGE_AUDIO_BUCKET", DEFAULT_AUDIO_BUCKET),
                video: env_or("STORAGE_VIDEO_BUCKET", DEFAULT_VIDEO_BUCKET),
            },
        }
    }

    /// Names of the settings that are empty. Startup logs them instead of
    /// refusing to boot.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("DASHSCOPE_API_KEY", &self.dashscope_api_key),
            ("STORAGE_URL", &self.storage_url),
            ("STORAGE_SERVICE_KEY", &self.storage_service_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
