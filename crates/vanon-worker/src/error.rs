//! Worker error types.
//!
//! Every variant except `Queue` and `Io` is job-fatal: the delivery is
//! rejected without requeue and the failure lands on the rejected stream.
//! Notification failures never appear here at all; the notifier logs and
//! swallows them.

use thiserror::Error;

use vanon_media::MediaError;
use vanon_queue::QueueError;
use vanon_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Message body could not be parsed into a job
    #[error("Malformed job message: {0}")]
    MalformedMessage(String),

    /// Source object could not be fetched from the store
    #[error("Fetch failed: {0}")]
    Fetch(#[source] StorageError),

    /// Decode, anonymize or re-encode failed
    #[error("Transform failed: {0}")]
    Transform(#[from] MediaError),

    /// Output artifact could not be published to the store
    #[error("Publish failed: {0}")]
    Publish(#[source] StorageError),

    /// Queue infrastructure failure (not tied to a single job)
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    pub fn fetch(err: StorageError) -> Self {
        Self::Fetch(err)
    }

    pub fn publish(err: StorageError) -> Self {
        Self::Publish(err)
    }

    /// Pipeline stage that produced this error, for logging and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MalformedMessage(_) => "parse",
            Self::Fetch(_) => "fetch",
            Self::Transform(_) => "transform",
            Self::Publish(_) => "publish",
            Self::Queue(_) => "queue",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_follow_the_pipeline() {
        assert_eq!(WorkerError::malformed("bad json").stage(), "parse");
        assert_eq!(
            WorkerError::fetch(StorageError::not_found("videos/clip.mp4")).stage(),
            "fetch"
        );
        assert_eq!(
            WorkerError::publish(StorageError::publish_failed("videos/processed/clip.mp4", "timeout"))
                .stage(),
            "publish"
        );
    }
}
