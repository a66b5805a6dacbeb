//! Shared data models for the vanon worker.
//!
//! This crate provides Serde-serializable types for:
//! - The queued anonymization job (wire message from the orchestrator)
//! - Job outcomes and the completion report posted back
//! - Face detection rectangles

pub mod job;
pub mod outcome;
pub mod rect;

// Re-export common types
pub use job::{AnonymizeJob, JobId};
pub use outcome::{CompletionReport, JobOutcome};
pub use rect::FaceRect;
