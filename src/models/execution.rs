use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single command dispatched to the execution backend.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub command: String,
    pub payload: String,
    pub site_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Backend answer to a submission. An empty `body` means the result is not ready yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitReceipt {
    #[serde(rename = "$id", alias = "id", default)]
    pub execution_id: String,
    #[serde(rename = "responseStatusCode", alias = "status_code", default)]
    pub status_code: u16,
    #[serde(rename = "responseBody", alias = "body", default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub status: BackendStatus,
    #[serde(rename = "responseStatusCode", alias = "status_code", default)]
    pub status_code: u16,
    #[serde(rename = "responseBody", alias = "body", default)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    #[default]
    #[serde(alias = "waiting", alias = "processing")]
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl BackendStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The backend or the remote site answered with an error status.
    Remote,
    /// The execution finished without ever producing a body.
    EmptyResponse,
    /// A success status arrived with a body that is not JSON.
    MalformedBody,
    /// The backend could not be reached to submit the command.
    Transport,
    /// The payload could not be serialized; nothing was submitted.
    InvalidPayload,
}

/// Terminal result of an [`ExecutionRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded {
        body: Value,
    },
    Failed {
        status_code: u16,
        message: String,
        reason: FailureReason,
    },
    TimedOut,
}

/// Shape of the payload the `wp-proxy` command expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyPayload<'a> {
    pub site_id: &'a str,
    pub method: &'a str,
    pub endpoint: &'a str,
    pub body: Option<&'a Value>,
}
