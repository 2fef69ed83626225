use crate::models::{ExecutionRequest, StatusReport, SubmitReceipt};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Execution backend unreachable: {0}")]
    Transport(String),

    /// The request left this process but no answer came back.
    #[error("No answer from execution backend: {0}")]
    Timeout(String),

    #[error("Invalid execution backend response: {0}")]
    Decode(String),
}

/// Request/response service that runs named commands on the bridge's behalf.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn submit(
        &self,
        request: &ExecutionRequest,
        synchronous: bool,
    ) -> Result<SubmitReceipt, BackendError>;

    async fn status(&self, command: &str, execution_id: &str)
    -> Result<StatusReport, BackendError>;
}

/// HTTP client for a function-execution service.
#[derive(Clone)]
pub struct HttpExecutionBackend {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpExecutionBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, api_key, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }

    fn executions_url(&self, command: &str) -> String {
        format!("{}/v1/functions/{}/executions", self.base_url, command)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn read_response(response: reqwest::Response) -> Result<(StatusCode, String), BackendError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(classify)?;
        Ok((status, text))
    }
}

/// Connect failures never reached the backend; anything later may have.
fn classify(e: reqwest::Error) -> BackendError {
    if e.is_connect() {
        BackendError::Transport(e.to_string())
    } else if e.is_timeout() || e.is_request() || e.is_body() {
        BackendError::Timeout(e.to_string())
    } else {
        BackendError::Transport(e.to_string())
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn submit(
        &self,
        request: &ExecutionRequest,
        synchronous: bool,
    ) -> Result<SubmitReceipt, BackendError> {
        let url = self.executions_url(&request.command);
        tracing::debug!(command = %request.command, site_id = ?request.site_id, %url, synchronous, "submitting execution");

        let envelope = json!({
            "body": request.payload,
            "async": !synchronous,
        });
        let response = self
            .authorize(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(envelope.to_string())
            .send()
            .await
            .map_err(classify)?;

        let (status, text) = Self::read_response(response).await?;
        if !status.is_success() {
            // The backend itself refused the submission; surface its answer as the outcome.
            return Ok(SubmitReceipt {
                execution_id: String::new(),
                status_code: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Decode(format!("{}: {}", e, text)))
    }

    async fn status(
        &self,
        command: &str,
        execution_id: &str,
    ) -> Result<StatusReport, BackendError> {
        let url = format!("{}/{}", self.executions_url(command), execution_id);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let (status, text) = Self::read_response(response).await?;
        if !status.is_success() {
            return Err(BackendError::Transport(format!(
                "status check returned {}",
                status.as_u16()
            )));
        }

        serde_json::from_str(&text).map_err(|e| BackendError::Decode(format!("{}: {}", e, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackendStatus;

    #[test]
    fn receipt_accepts_function_service_field_names() {
        let receipt: SubmitReceipt = serde_json::from_str(
            r#"{"$id": "exec-1", "status": "completed", "responseStatusCode": 200, "responseBody": "[]"}"#,
        )
        .unwrap();
        assert_eq!(receipt.execution_id, "exec-1");
        assert_eq!(receipt.status_code, 200);
        assert_eq!(receipt.body, "[]");
    }

    #[test]
    fn status_report_maps_in_progress_states_to_pending() {
        for raw in ["waiting", "processing", "pending"] {
            let report: StatusReport =
                serde_json::from_str(&format!(r#"{{"status": "{raw}"}}"#)).unwrap();
            assert_eq!(report.status, BackendStatus::Pending);
            assert!(report.body.is_empty());
        }

        let report: StatusReport =
            serde_json::from_str(r#"{"status": "scheduled"}"#).unwrap();
        assert_eq!(report.status, BackendStatus::Unknown);
        assert!(!report.status.is_terminal());
    }

    fn submit_request() -> ExecutionRequest {
        ExecutionRequest {
            command: "wp-proxy".to_string(),
            payload: "{}".to_string(),
            site_id: Some("s1".to_string()),
            submitted_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpExecutionBackend::new(format!("http://{addr}"), None).unwrap();
        let err = backend.submit(&submit_request(), true).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn silent_backend_after_send_is_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let backend = HttpExecutionBackend::with_timeout(
            format!("http://{addr}"),
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        let err = backend.submit(&submit_request(), true).await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout(_)), "{err:?}");
    }

    #[test]
    fn builds_urls_without_double_slashes() {
        let backend = HttpExecutionBackend::new("http://127.0.0.1:8080/", None).unwrap();
        assert_eq!(
            backend.executions_url("wp-proxy"),
            "http://127.0.0.1:8080/v1/functions/wp-proxy/executions"
        );
    }
}
