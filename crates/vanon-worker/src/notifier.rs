//! Completion notifier.
//!
//! Best-effort callback to the orchestrator after a job has been fully
//! persisted. Delivery failures are logged and swallowed: the artifact is
//! already durable and discoverable by key derivation, so a missed callback
//! must never fail the job or trigger reprocessing.

use std::time::Duration;

use tracing::{debug, warn};

use vanon_models::JobOutcome;

use crate::config::WorkerConfig;

/// HTTP client for orchestrator completion callbacks.
pub struct CompletionNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl CompletionNotifier {
    /// Create a notifier for the given orchestrator base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.orchestrator_base_url.clone(), config.notify_timeout)
    }

    /// Notify the orchestrator that a job completed.
    ///
    /// Fire-and-forget: every failure mode (connect, timeout, non-2xx) is
    /// logged at warn and dropped.
    pub async fn notify_complete(&self, outcome: &JobOutcome) {
        let url = format!("{}/videos/{}/complete", self.base_url, outcome.job_id);

        let result = self
            .client
            .post(&url)
            .json(&outcome.report())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Completion callback delivered for job {}", outcome.job_id);
            }
            Ok(response) => {
                warn!(
                    "Completion callback for job {} returned {}",
                    outcome.job_id,
                    response.status()
                );
            }
            Err(e) => {
                warn!(
                    "Completion callback for job {} failed: {}",
                    outcome.job_id, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanon_models::JobId;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn outcome(job_id: &str, key: &str) -> JobOutcome {
        JobOutcome {
            job_id: JobId::from_string(job_id.to_string()),
            processed_object_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn posts_processed_key_to_completion_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/videos/job-42/complete"))
            .and(body_json(serde_json::json!({
                "processedObjectKey": "processed/clip.mp4"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = CompletionNotifier::new(server.uri(), Duration::from_secs(2));
        notifier
            .notify_complete(&outcome("job-42", "processed/clip.mp4"))
            .await;
    }

    #[tokio::test]
    async fn server_error_is_swallowed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = CompletionNotifier::new(server.uri(), Duration::from_secs(2));
        // Must not panic or return an error
        notifier
            .notify_complete(&outcome("job-43", "processed/clip.mp4"))
            .await;
    }

    #[tokio::test]
    async fn unreachable_orchestrator_is_swallowed() {
        // Nothing listens here
        let notifier =
            CompletionNotifier::new("http://127.0.0.1:1", Duration::from_millis(200));
        notifier
            .notify_complete(&outcome("job-44", "processed/clip.mp4"))
            .await;
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let notifier = CompletionNotifier::new("http://host:8080/", Duration::from_secs(1));
        assert_eq!(notifier.base_url, "http://host:8080");
    }
}
