use crate::error::{AppError, Result};
use crate::executor::{ExecutionClient, PollPolicy};
use crate::models::{
    ExecutionOutcome, FailureReason, PluginStatus, ProxyPayload, RemotePlugin, RemoteTheme,
    ThemeAction,
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const PROXY_COMMAND: &str = "wp-proxy";

/// Characters kept as-is in a REST path segment; everything else, `/` included, is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escapes a plugin slug such as `akismet/akismet.php` for use as one path segment.
pub fn encode_slug(slug: &str) -> String {
    utf8_percent_encode(slug, SEGMENT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Runs WordPress REST calls on a connected site through the `wp-proxy` command.
#[derive(Clone)]
pub struct CommandProxy {
    client: ExecutionClient,
    interactive: PollPolicy,
    data_fetch: PollPolicy,
}

impl CommandProxy {
    pub fn new(client: ExecutionClient) -> Self {
        Self::with_policies(client, PollPolicy::INTERACTIVE, PollPolicy::DATA_FETCH)
    }

    /// Uses `interactive` for admin actions and `data_fetch` for list reads.
    pub fn with_policies(
        client: ExecutionClient,
        interactive: PollPolicy,
        data_fetch: PollPolicy,
    ) -> Self {
        Self {
            client,
            interactive,
            data_fetch,
        }
    }

    pub async fn run_site_command<T: DeserializeOwned>(
        &self,
        site_id: &str,
        endpoint: &str,
        method: HttpMethod,
        body: Option<&Value>,
        policy: PollPolicy,
    ) -> Result<T> {
        let payload = ProxyPayload {
            site_id,
            method: method.as_str(),
            endpoint,
            body,
        };
        tracing::debug!(site_id, endpoint, method = method.as_str(), "Proxying site command");

        let outcome = self
            .client
            .execute(PROXY_COMMAND, &payload, Some(site_id), true, policy)
            .await;

        match outcome {
            ExecutionOutcome::Succeeded { body } => serde_json::from_value(body).map_err(|e| {
                AppError::MalformedResponse(format!("Unexpected response from {}: {}", endpoint, e))
            }),
            ExecutionOutcome::Failed {
                message,
                reason: FailureReason::MalformedBody,
                ..
            } => Err(AppError::MalformedResponse(message)),
            ExecutionOutcome::Failed {
                status_code,
                message,
                ..
            } => Err(AppError::RemoteFailed {
                status: status_code,
                message,
            }),
            ExecutionOutcome::TimedOut => Err(AppError::NoResponse),
        }
    }

    pub async fn list_plugins(&self, site_id: &str) -> Result<Vec<RemotePlugin>> {
        self.run_site_command(site_id, "/plugins", HttpMethod::Get, None, self.data_fetch)
            .await
    }

    pub async fn set_plugin_status(
        &self,
        site_id: &str,
        plugin: &str,
        status: PluginStatus,
    ) -> Result<RemotePlugin> {
        let body = json!({ "status": status.as_str() });
        self.run_site_command(
            site_id,
            &format!("/plugins/{}", encode_slug(plugin)),
            HttpMethod::Post,
            Some(&body),
            self.interactive,
        )
        .await
    }

    pub async fn install_plugin(
        &self,
        site_id: &str,
        slug: &str,
        activate: bool,
    ) -> Result<RemotePlugin> {
        let status = if activate {
            PluginStatus::Active
        } else {
            PluginStatus::Inactive
        };
        let body = json!({ "slug": slug, "status": status.as_str() });
        self.run_site_command(
            site_id,
            "/plugins",
            HttpMethod::Post,
            Some(&body),
            self.interactive,
        )
        .await
    }

    pub async fn delete_plugin(&self, site_id: &str, plugin: &str) -> Result<Value> {
        self.run_site_command(
            site_id,
            &format!("/plugins/{}", encode_slug(plugin)),
            HttpMethod::Delete,
            None,
            self.interactive,
        )
        .await
    }

    pub async fn list_themes(&self, site_id: &str) -> Result<Vec<RemoteTheme>> {
        self.run_site_command(site_id, "/themes", HttpMethod::Get, None, self.data_fetch)
            .await
    }

    pub async fn manage_theme(
        &self,
        site_id: &str,
        stylesheet: &str,
        action: ThemeAction,
    ) -> Result<Value> {
        let endpoint = format!("/themes/{}", encode_slug(stylesheet));
        match action {
            ThemeAction::Activate => {
                let body = json!({ "status": "active" });
                self.run_site_command(
                    site_id,
                    &endpoint,
                    HttpMethod::Post,
                    Some(&body),
                    self.interactive,
                )
                .await
            }
            ThemeAction::Delete => {
                self.run_site_command(
                    site_id,
                    &endpoint,
                    HttpMethod::Delete,
                    None,
                    self.interactive,
                )
                .await
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Backend double shared by the service and router tests.

    use super::CommandProxy;
    use crate::executor::{BackendError, ExecutionBackend, ExecutionClient, PollPolicy};
    use crate::models::{ExecutionRequest, StatusReport, SubmitReceipt};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Bound short enough for tests that wait out a backend that never answers.
    pub const FAST_POLL: PollPolicy = PollPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(1),
    };

    pub fn fast_proxy(backend: &Arc<FakeBackend>) -> CommandProxy {
        CommandProxy::with_policies(ExecutionClient::new(backend.clone()), FAST_POLL, FAST_POLL)
    }

    /// Answers every submission inline with a fixed status and body and
    /// records the decoded proxy payloads. When gated, submissions block until
    /// [`FakeBackend::release`] is called.
    pub struct FakeBackend {
        status_code: Mutex<u16>,
        body: Mutex<String>,
        pub submits: AtomicU32,
        pub payloads: Mutex<Vec<Value>>,
        gate: Option<Notify>,
        pub entered: Notify,
    }

    impl FakeBackend {
        pub fn new(status_code: u16, body: &str) -> Self {
            Self {
                status_code: Mutex::new(status_code),
                body: Mutex::new(body.to_string()),
                submits: AtomicU32::new(0),
                payloads: Mutex::new(Vec::new()),
                gate: None,
                entered: Notify::new(),
            }
        }

        pub fn gated(status_code: u16, body: &str) -> Self {
            Self {
                gate: Some(Notify::new()),
                ..Self::new(status_code, body)
            }
        }

        pub fn respond(&self, status_code: u16, body: &str) {
            *self.status_code.lock().unwrap() = status_code;
            *self.body.lock().unwrap() = body.to_string();
        }

        pub fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        pub fn submit_count(&self) -> u32 {
            self.submits.load(Ordering::SeqCst)
        }

        pub fn last_payload(&self) -> Option<Value> {
            self.payloads.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ExecutionBackend for FakeBackend {
        async fn submit(
            &self,
            request: &ExecutionRequest,
            _synchronous: bool,
        ) -> Result<SubmitReceipt, BackendError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            self.payloads
                .lock()
                .unwrap()
                .push(serde_json::from_str(&request.payload).unwrap());
            if let Some(gate) = &self.gate {
                self.entered.notify_one();
                gate.notified().await;
            }
            Ok(SubmitReceipt {
                execution_id: "exec-1".to_string(),
                status_code: *self.status_code.lock().unwrap(),
                body: self.body.lock().unwrap().clone(),
            })
        }

        async fn status(
            &self,
            _command: &str,
            _execution_id: &str,
        ) -> Result<StatusReport, BackendError> {
            Ok(StatusReport::default())
        }
    }
}
