//! Face anonymization worker.
//!
//! This crate provides:
//! - Job executor consuming one delivery at a time from the queue
//! - Fetch, transform, publish processing for a single job
//! - Best-effort completion callbacks to the orchestrator
//! - Graceful shutdown that finishes the in-flight job

pub mod config;
pub mod error;
pub mod executor;
pub mod notifier;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use notifier::CompletionNotifier;
pub use processor::JobProcessor;
