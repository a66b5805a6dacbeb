//! Job queue using Redis Streams.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use vanon_models::AnonymizeJob;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Stream receiving rejected (permanently dropped) jobs
    pub rejected_stream_name: String,
    /// Minimum idle time before a pending delivery can be claimed from a
    /// crashed worker
    pub claim_min_idle: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vanon:jobs".to_string(),
            consumer_group: "vanon:workers".to_string(),
            rejected_stream_name: "vanon:rejected".to_string(),
            claim_min_idle: Duration::from_secs(300),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "vanon:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "vanon:workers".to_string()),
            rejected_stream_name: std::env::var("QUEUE_REJECTED_STREAM")
                .unwrap_or_else(|_| "vanon:rejected".to_string()),
            claim_min_idle: Duration::from_secs(
                std::env::var("QUEUE_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }
}

/// One message handed to a consumer.
///
/// The payload is returned raw so the consumer owns the parse-failure
/// classification: a malformed body is a permanent rejection, not something
/// the queue silently swallows.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry ID, used for ack/reject
    pub message_id: String,
    /// Raw job payload as enqueued
    pub payload: String,
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    "Consumer group already exists: {}",
                    self.config.consumer_group
                );
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue an anonymization job.
    pub async fn enqueue(&self, job: &AnonymizeJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            "Enqueued job {} with message ID {}",
            job.job_id, message_id
        );

        Ok(message_id)
    }

    /// Receive at most one message, blocking up to `block_ms`.
    ///
    /// One in-flight delivery per consumer: this never prefetches.
    pub async fn consume_one(
        &self,
        consumer_name: &str,
        block_ms: u64,
    ) -> QueueResult<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload = String::from_utf8_lossy(payload).into_owned();
                    debug!("Consumed message {} from stream", message_id);
                    return Ok(Some(Delivery {
                        message_id,
                        payload,
                    }));
                }

                // Entry without a job field carries nothing processable
                warn!("Rejecting message {} without job payload", message_id);
                self.reject(
                    &Delivery {
                        message_id,
                        payload: String::new(),
                    },
                    "missing job payload field",
                )
                .await?;
            }
        }

        Ok(None)
    }

    /// Acknowledge a delivery (mark as permanently done).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged message: {}", message_id);
        Ok(())
    }

    /// Reject a delivery without requeueing it.
    ///
    /// The payload is copied to the rejected stream with the failure reason
    /// for diagnostics, then the original is acknowledged so the broker
    /// never redelivers it.
    pub async fn reject(&self, delivery: &Delivery, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XADD")
            .arg(&self.config.rejected_stream_name)
            .arg("*")
            .arg("job")
            .arg(&delivery.payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(&delivery.message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(&delivery.message_id).await?;

        warn!(
            "Rejected message {} without requeue: {}",
            delivery.message_id, error
        );
        Ok(())
    }

    /// Claim one pending delivery that has been idle for too long.
    ///
    /// This is the redelivery path for jobs abandoned by crashed workers:
    /// XAUTOCLAIM scans the pending entries list from the start and hands
    /// over at most one entry idle past the configured threshold.
    pub async fn claim_stale(&self, consumer_name: &str) -> QueueResult<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(self.config.claim_min_idle.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await?;

        for entry in result.claimed {
            let message_id = entry.id.clone();

            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                let payload = String::from_utf8_lossy(payload).into_owned();
                info!("Claimed stale message {} from stream", message_id);
                return Ok(Some(Delivery {
                    message_id,
                    payload,
                }));
            }

            warn!("Rejecting claimed message {} without job payload", message_id);
            self.reject(
                &Delivery {
                    message_id,
                    payload: String::new(),
                },
                "missing job payload field",
            )
            .await?;
        }

        Ok(None)
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get rejected stream length.
    pub async fn rejected_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.rejected_stream_name).await?;
        Ok(len)
    }
}
