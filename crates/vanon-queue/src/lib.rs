//! Redis Streams work queue.
//!
//! Competing-consumer semantics via a consumer group: the broker delivers
//! each message to exactly one consumer at a time, acknowledgment marks it
//! permanently done, and rejection moves it to a diagnostics stream without
//! requeueing.

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{Delivery, JobQueue, QueueConfig};
