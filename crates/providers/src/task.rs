//! DashScope async-task envelope shared by image and video synthesis.

use serde::Deserialize;

use crate::error::ProviderError;

pub(crate) const STATUS_SUCCEEDED: &str = "SUCCEEDED";
pub(crate) const STATUS_FAILED: &str = "FAILED";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskEnvelope {
    #[serde(default)]
    pub output: Option<TaskOutput>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub results: Vec<TaskResult>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskResult {
    #[serde(default)]
    pub url: Option<String>,
}

impl TaskEnvelope {
    /// Task id from a submit response.
    pub fn task_id(self) -> Result<String, ProviderError> {
        self.output
            .and_then(|o| o.task_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("No task ID received".to_string()))
    }

    pub fn status(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.task_status.as_deref())
            .unwrap_or("UNKNOWN")
    }

    pub fn into_output(self) -> TaskOutput {
        self.output.unwrap_or_default()
    }
}
