//! Single-job processing.
//!
//! Fetch the source object, run the anonymization transform, publish the
//! artifact. Staged files are deleted on success and retained on failure so
//! a failed job can be inspected on disk.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use vanon_media::DetectorConfig;
use vanon_models::{AnonymizeJob, JobOutcome};
use vanon_storage::{download_path, output_path, processed_object_key, validate_key, ObjectStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Shared context for job processing.
pub struct JobProcessor {
    config: WorkerConfig,
    store: ObjectStore,
    detector_config: DetectorConfig,
}

impl JobProcessor {
    /// Create a processor.
    pub fn new(config: WorkerConfig, store: ObjectStore) -> Self {
        let detector_config = DetectorConfig::from_env();
        Self {
            config,
            store,
            detector_config,
        }
    }

    /// Process one job end to end and return its outcome.
    ///
    /// The outcome is returned only after the artifact is durably published;
    /// the caller acknowledges the delivery and fires the completion
    /// callback afterwards.
    pub async fn process(&self, job: &AnonymizeJob) -> WorkerResult<JobOutcome> {
        validate_key(&job.original_object_key)
            .map_err(|e| WorkerError::malformed(e.to_string()))?;

        let processed_key = processed_object_key(&job.original_object_key);
        let input = download_path(&self.config.work_dir, &job.original_object_key);
        let output = output_path(&self.config.work_dir, &processed_key);

        info!(
            "Processing job {}: {}/{} -> {}/{}",
            job.job_id, job.bucket, job.original_object_key, job.bucket, processed_key
        );

        self.store
            .fetch(&job.bucket, &job.original_object_key, &input)
            .await
            .map_err(WorkerError::fetch)?;

        let report = vanon_media::transform_video(
            &input,
            &output,
            self.detector_config.clone(),
            self.config.reencode_timeout.as_secs(),
        )
        .await?;

        info!(
            "Job {} transformed: {} frames, {} face regions blurred",
            job.job_id, report.frames, report.faces_blurred
        );

        self.store
            .publish(&job.bucket, &processed_key, &output)
            .await
            .map_err(WorkerError::publish)?;

        cleanup_staged(&input, &output).await;

        Ok(JobOutcome {
            job_id: job.job_id.clone(),
            processed_object_key: processed_key,
        })
    }
}

/// Remove staged files after a successful publish.
///
/// Failures here are logged only; stale staging files are an operational
/// nuisance, not a correctness problem.
async fn cleanup_staged(input: &Path, output: &Path) {
    for path in [input, output] {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove staged file {}: {}", path.display(), e);
            }
        }
    }
}

/// Staging paths a job will use, for logging and tests.
pub fn staging_paths(work_dir: &str, original_key: &str) -> (PathBuf, PathBuf) {
    let processed_key = processed_object_key(original_key);
    (
        download_path(work_dir, original_key),
        output_path(work_dir, &processed_key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_paths_never_collide() {
        let (input, output) = staging_paths("/tmp/vanon", "clip.mp4");
        assert_eq!(input, PathBuf::from("/tmp/vanon/downloads/clip.mp4"));
        assert_eq!(
            output,
            PathBuf::from("/tmp/vanon/outputs/processed/clip.mp4")
        );
        assert_ne!(input, output);
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("gone-a.mp4");
        let b = dir.path().join("gone-b.mp4");
        cleanup_staged(&a, &b).await;
    }

    #[tokio::test]
    async fn fetch_failure_stops_the_pipeline() {
        use vanon_models::{AnonymizeJob, JobId};
        use vanon_storage::StoreConfig;

        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_string_lossy().into_owned();

        // Nothing listens here, so the fetch stage fails
        let store = ObjectStore::new(StoreConfig {
            endpoint_url: "http://127.0.0.1:1".to_string(),
            access_key_id: "test".to_string(),
            secret_access_key: "test".to_string(),
            region: "us-east-1".to_string(),
        });
        let config = WorkerConfig {
            work_dir: work_dir.clone(),
            ..WorkerConfig::default()
        };
        let processor = JobProcessor::new(config, store);

        let job =
            AnonymizeJob::new("videos", "clip.mp4").with_job_id(JobId::from_string("42"));
        let err = processor.process(&job).await.unwrap_err();
        assert_eq!(err.stage(), "fetch");

        // Neither transform nor publish ran: no staged files exist
        let (input, output) = staging_paths(&work_dir, "clip.mp4");
        assert!(!input.exists());
        assert!(!output.exists());
    }
}
