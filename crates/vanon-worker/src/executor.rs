//! Job executor.
//!
//! Pulls one delivery at a time from the queue and drives it through the
//! processor. There is never more than one in-flight job per worker, so a
//! crash loses at most one delivery and the claim path recovers it.

use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vanon_models::AnonymizeJob;
use vanon_queue::{Delivery, JobQueue};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::notifier::CompletionNotifier;
use crate::processor::JobProcessor;

/// Job executor that processes queue deliveries one at a time.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    processor: JobProcessor,
    notifier: CompletionNotifier,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue, processor: JobProcessor) -> Self {
        let notifier = CompletionNotifier::from_config(&config);
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            processor,
            notifier,
            shutdown,
            consumer_name,
        }
    }

    /// Handle for requesting shutdown from another task.
    pub fn shutdown_handle(&self) -> tokio::sync::watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Run the consume loop until shutdown.
    ///
    /// An in-flight job always runs to completion (ack or reject) before
    /// the loop observes the shutdown flag.
    pub async fn run(&self) -> WorkerResult<()> {
        info!("Starting job executor '{}'", self.consumer_name);

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut last_claim = Instant::now();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            // Periodically recover deliveries abandoned by crashed workers
            if last_claim.elapsed() >= self.config.claim_interval {
                last_claim = Instant::now();
                match self.queue.claim_stale(&self.consumer_name).await {
                    Ok(Some(delivery)) => {
                        info!("Recovered stale delivery {}", delivery.message_id);
                        self.handle_delivery(delivery).await;
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Failed to claim stale deliveries: {}", e),
                }
            }

            let block_ms = self.config.consume_block.as_millis() as u64;
            tokio::select! {
                _ = shutdown_rx.changed() => {}
                result = self.queue.consume_one(&self.consumer_name, block_ms) => {
                    match result {
                        Ok(Some(delivery)) => self.handle_delivery(delivery).await,
                        Ok(None) => {}
                        Err(e) => {
                            error!("Error consuming from queue: {}", e);
                            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        }
                    }
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Drive one delivery to ack or reject.
    async fn handle_delivery(&self, delivery: Delivery) {
        counter!("vanon_jobs_received_total").increment(1);

        let job: AnonymizeJob = match serde_json::from_str(&delivery.payload) {
            Ok(job) => job,
            Err(e) => {
                let err = WorkerError::malformed(e.to_string());
                error!("Rejecting malformed delivery {}: {}", delivery.message_id, err);
                self.reject(&delivery, &err).await;
                return;
            }
        };

        debug!(
            "Picked up job {} (enqueued at {})",
            job.job_id, job.enqueued_at
        );

        let started = Instant::now();
        match self.processor.process(&job).await {
            Ok(outcome) => {
                info!(
                    "Job {} completed in {:.1}s, published {}",
                    outcome.job_id,
                    started.elapsed().as_secs_f64(),
                    outcome.processed_object_key
                );
                counter!("vanon_jobs_completed_total").increment(1);

                // Notify before ack: a crash between publish and ack causes
                // an idempotent reprocess, while a crash after ack with no
                // callback would strand the orchestrator.
                self.notifier.notify_complete(&outcome).await;

                if let Err(e) = self.queue.ack(&delivery.message_id).await {
                    error!("Failed to ack delivery {}: {}", delivery.message_id, e);
                }
            }
            Err(err) => {
                error!(
                    "Job {} failed at stage '{}': {}",
                    job.job_id,
                    err.stage(),
                    err
                );
                self.reject(&delivery, &err).await;
            }
        }
    }

    async fn reject(&self, delivery: &Delivery, err: &WorkerError) {
        counter!("vanon_jobs_rejected_total", "stage" => err.stage()).increment(1);

        if let Err(e) = self.queue.reject(delivery, &err.to_string()).await {
            error!("Failed to reject delivery {}: {}", delivery.message_id, e);
        } else {
            debug!("Delivery {} rejected without requeue", delivery.message_id);
        }
    }
}
