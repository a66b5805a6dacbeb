//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Work directory for staged downloads and outputs
    pub work_dir: String,
    /// Base URL of the orchestrator receiving completion callbacks
    pub orchestrator_base_url: String,
    /// Timeout for a single completion callback
    pub notify_timeout: Duration,
    /// Wall-clock timeout for the final re-encode
    pub reencode_timeout: Duration,
    /// How long a consume call blocks waiting for a job
    pub consume_block: Duration,
    /// How often to look for deliveries abandoned by crashed workers
    pub claim_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: "/tmp/vanon".to_string(),
            orchestrator_base_url: "http://localhost:8080".to_string(),
            notify_timeout: Duration::from_secs(10),
            reencode_timeout: Duration::from_secs(600),
            consume_block: Duration::from_secs(5),
            claim_interval: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/vanon".to_string()),
            orchestrator_base_url: std::env::var("ORCHESTRATOR_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            notify_timeout: Duration::from_secs(
                std::env::var("WORKER_NOTIFY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            reencode_timeout: Duration::from_secs(
                std::env::var("WORKER_REENCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            consume_block: Duration::from_secs(
                std::env::var("WORKER_CONSUME_BLOCK_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.work_dir, "/tmp/vanon");
        assert_eq!(config.orchestrator_base_url, "http://localhost:8080");
        assert_eq!(config.reencode_timeout, Duration::from_secs(600));
    }
}
