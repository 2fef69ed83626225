//! Uniform "submit then maybe poll" access to the execution backend.
//!
//! A command is submitted exactly once. If the backend answers inline the
//! outcome is resolved from that answer; otherwise the same execution is
//! re-checked at a fixed interval until a body shows up, the backend reports a
//! terminal status, or the attempt bound is reached.

use crate::executor::{BackendError, ExecutionBackend};
use crate::models::{ExecutionOutcome, ExecutionRequest, FailureReason};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const INTERACTIVE_ATTEMPTS: u32 = 5;
const DATA_FETCH_ATTEMPTS: u32 = 10;

/// Bound on how long an execution is waited for after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// Admin actions the user is actively waiting on.
    pub const INTERACTIVE: Self = Self {
        max_attempts: INTERACTIVE_ATTEMPTS,
        interval: POLL_INTERVAL,
    };

    /// Reads that may take longer on large sites.
    pub const DATA_FETCH: Self = Self {
        max_attempts: DATA_FETCH_ATTEMPTS,
        interval: POLL_INTERVAL,
    };
}

#[derive(Clone)]
pub struct ExecutionClient {
    backend: Arc<dyn ExecutionBackend>,
}

impl ExecutionClient {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute<P: Serialize + ?Sized>(
        &self,
        command: &str,
        payload: &P,
        site_id: Option<&str>,
        synchronous: bool,
        policy: PollPolicy,
    ) -> ExecutionOutcome {
        let payload = match serde_json::to_string(payload) {
            Ok(payload) => payload,
            Err(e) => {
                return ExecutionOutcome::Failed {
                    status_code: 400,
                    message: format!("Failed to serialize payload: {}", e),
                    reason: FailureReason::InvalidPayload,
                };
            }
        };

        let request = ExecutionRequest {
            command: command.to_string(),
            payload,
            site_id: site_id.map(str::to_string),
            submitted_at: Utc::now(),
        };

        let outcome = self.run(&request, synchronous, policy).await;
        match &outcome {
            ExecutionOutcome::Succeeded { .. } => {
                tracing::debug!(command, site_id = ?request.site_id, "execution succeeded")
            }
            ExecutionOutcome::Failed {
                status_code,
                reason,
                ..
            } => tracing::warn!(
                command,
                site_id = ?request.site_id,
                status_code,
                ?reason,
                "execution failed"
            ),
            ExecutionOutcome::TimedOut => tracing::warn!(
                command,
                site_id = ?request.site_id,
                elapsed_ms = (Utc::now() - request.submitted_at).num_milliseconds(),
                "execution timed out"
            ),
        }
        outcome
    }

    async fn run(
        &self,
        request: &ExecutionRequest,
        synchronous: bool,
        policy: PollPolicy,
    ) -> ExecutionOutcome {
        let receipt = match self.backend.submit(request, synchronous).await {
            Ok(receipt) => receipt,
            Err(BackendError::Timeout(e)) => {
                // The command may have run; only its answer was lost.
                tracing::warn!(command = %request.command, "submission outcome unknown: {}", e);
                return ExecutionOutcome::TimedOut;
            }
            Err(e) => {
                return ExecutionOutcome::Failed {
                    status_code: 502,
                    message: e.to_string(),
                    reason: FailureReason::Transport,
                };
            }
        };

        if has_body(&receipt.body) {
            return resolve_body(receipt.status_code, &receipt.body);
        }

        if receipt.execution_id.is_empty() {
            return empty_response(receipt.status_code);
        }

        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;

            let report = match self
                .backend
                .status(&request.command, &receipt.execution_id)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(
                        command = %request.command,
                        execution_id = %receipt.execution_id,
                        attempt,
                        "status check failed: {}",
                        e
                    );
                    continue;
                }
            };

            if has_body(&report.body) {
                return resolve_body(report.status_code, &report.body);
            }
            if report.status.is_terminal() {
                return empty_response(report.status_code);
            }

            tracing::debug!(
                command = %request.command,
                execution_id = %receipt.execution_id,
                attempt,
                "execution still pending"
            );
        }

        ExecutionOutcome::TimedOut
    }
}

fn has_body(body: &str) -> bool {
    !body.trim().is_empty()
}

fn empty_response(status_code: u16) -> ExecutionOutcome {
    ExecutionOutcome::Failed {
        status_code,
        message: "empty response".to_string(),
        reason: FailureReason::EmptyResponse,
    }
}

/// Classifies a non-empty body. Never fails: undecodable text becomes the message.
pub fn resolve_body(status_code: u16, body: &str) -> ExecutionOutcome {
    match serde_json::from_str::<Value>(body) {
        Ok(value) if status_code < 400 => ExecutionOutcome::Succeeded { body: value },
        Ok(value) => ExecutionOutcome::Failed {
            status_code,
            message: extract_message(&value)
                .unwrap_or_else(|| format!("Request failed with status {}", status_code)),
            reason: FailureReason::Remote,
        },
        Err(_) => ExecutionOutcome::Failed {
            status_code,
            message: body.trim().to_string(),
            reason: if status_code < 400 {
                FailureReason::MalformedBody
            } else {
                FailureReason::Remote
            },
        },
    }
}

fn extract_message(value: &Value) -> Option<String> {
    ["message", "error"].iter().find_map(|key| match value.get(*key) {
        Some(Value::String(message)) if !message.trim().is_empty() => Some(message.clone()),
        Some(nested @ Value::Object(_)) => extract_message(nested),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendStatus, StatusReport, SubmitReceipt};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: PollPolicy = PollPolicy {
        max_attempts: 5,
        interval: Duration::from_millis(1),
    };

    /// Backend that replays a fixed receipt and a queue of status reports.
    struct ScriptedBackend {
        receipt: SubmitReceipt,
        submit_error: Mutex<Option<BackendError>>,
        reports: Mutex<VecDeque<Result<StatusReport, BackendError>>>,
        submits: AtomicU32,
        polls: AtomicU32,
    }

    impl ScriptedBackend {
        fn failing_submit(error: BackendError) -> Self {
            let backend = Self::new(SubmitReceipt::default(), vec![]);
            *backend.submit_error.lock().unwrap() = Some(error);
            backend
        }

        fn new(receipt: SubmitReceipt, reports: Vec<Result<StatusReport, BackendError>>) -> Self {
            Self {
                receipt,
                submit_error: Mutex::new(None),
                reports: Mutex::new(reports.into()),
                submits: AtomicU32::new(0),
                polls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn submit(
            &self,
            _request: &ExecutionRequest,
            _synchronous: bool,
        ) -> Result<SubmitReceipt, BackendError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.submit_error.lock().unwrap().take() {
                return Err(error);
            }
            Ok(self.receipt.clone())
        }

        async fn status(
            &self,
            _command: &str,
            _execution_id: &str,
        ) -> Result<StatusReport, BackendError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.reports
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(pending()))
        }
    }

    fn receipt(status_code: u16, body: &str) -> SubmitReceipt {
        SubmitReceipt {
            execution_id: "exec-1".to_string(),
            status_code,
            body: body.to_string(),
        }
    }

    fn pending() -> StatusReport {
        StatusReport {
            status: BackendStatus::Pending,
            status_code: 0,
            body: String::new(),
        }
    }

    fn client(backend: &Arc<ScriptedBackend>) -> ExecutionClient {
        ExecutionClient::new(backend.clone())
    }

    #[tokio::test]
    async fn inline_body_resolves_without_polling() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(200, r#"[{"name":"Akismet"}]"#),
            vec![],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), Some("s1"), true, FAST)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Succeeded {
                body: json!([{"name": "Akismet"}])
            }
        );
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_status_extracts_message_from_body() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(
                403,
                r#"{"code":"rest_forbidden","message":"Sorry, you are not allowed to do that."}"#,
            ),
            vec![],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, true, FAST)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                status_code: 403,
                message: "Sorry, you are not allowed to do that.".to_string(),
                reason: FailureReason::Remote,
            }
        );
    }

    #[test]
    fn error_status_without_message_uses_generic_text() {
        let outcome = resolve_body(500, r#"{"ok": false}"#);
        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                status_code: 500,
                message: "Request failed with status 500".to_string(),
                reason: FailureReason::Remote,
            }
        );
    }

    #[tokio::test]
    async fn delayed_body_resolves_on_third_poll() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(0, ""),
            vec![
                Ok(pending()),
                Ok(pending()),
                Ok(StatusReport {
                    status: BackendStatus::Completed,
                    status_code: 200,
                    body: r#"{"plugin":"akismet/akismet.php","status":"active"}"#.to_string(),
                }),
            ],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, true, FAST)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Succeeded {
                body: json!({"plugin": "akismet/akismet.php", "status": "active"})
            }
        );
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_answering_backend_times_out_without_resubmitting() {
        let backend = Arc::new(ScriptedBackend::new(receipt(0, ""), vec![]));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, false, FAST)
            .await;

        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.polls.load(Ordering::SeqCst), FAST.max_attempts);
    }

    #[tokio::test]
    async fn lost_submit_answer_is_timed_out_not_failed() {
        let backend = Arc::new(ScriptedBackend::failing_submit(BackendError::Timeout(
            "operation timed out".to_string(),
        )));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), Some("s1"), true, FAST)
            .await;

        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert_eq!(backend.submits.load(Ordering::SeqCst), 1);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_failure() {
        let backend = Arc::new(ScriptedBackend::failing_submit(BackendError::Transport(
            "connection refused".to_string(),
        )));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), Some("s1"), true, FAST)
            .await;

        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                status_code: 502,
                reason: FailureReason::Transport,
                ..
            }
        ));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn terminal_status_without_body_is_empty_response() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(0, ""),
            vec![
                Ok(pending()),
                Ok(StatusReport {
                    status: BackendStatus::Failed,
                    status_code: 500,
                    body: "  ".to_string(),
                }),
            ],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, true, FAST)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                status_code: 500,
                message: "empty response".to_string(),
                reason: FailureReason::EmptyResponse,
            }
        );
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_status_checks_count_as_attempts() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(0, ""),
            vec![
                Err(BackendError::Transport("connection reset".to_string())),
                Ok(StatusReport {
                    status: BackendStatus::Completed,
                    status_code: 200,
                    body: "[]".to_string(),
                }),
            ],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, true, FAST)
            .await;

        assert_eq!(outcome, ExecutionOutcome::Succeeded { body: json!([]) });
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_json_success_body_is_reported_not_raised() {
        let backend = Arc::new(ScriptedBackend::new(
            receipt(200, "<html>Fatal error</html>"),
            vec![],
        ));

        let outcome = client(&backend)
            .execute("wp-proxy", &json!({}), None, true, FAST)
            .await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                status_code: 200,
                message: "<html>Fatal error</html>".to_string(),
                reason: FailureReason::MalformedBody,
            }
        );
    }

    #[test]
    fn nested_error_objects_are_searched() {
        let value = json!({"error": {"message": "Invalid credentials"}});
        assert_eq!(extract_message(&value), Some("Invalid credentials".to_string()));
    }

    #[test]
    fn policies_are_bounded() {
        assert_eq!(PollPolicy::INTERACTIVE.max_attempts, 5);
        assert_eq!(PollPolicy::DATA_FETCH.max_attempts, 10);
        assert!(PollPolicy::INTERACTIVE.interval > Duration::ZERO);
    }
}
