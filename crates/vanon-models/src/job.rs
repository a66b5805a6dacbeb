//! Job definitions for queue processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
///
/// Opaque to the worker: the orchestrator mints it and the worker echoes it
/// back in the completion report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_enqueued_at() -> DateTime<Utc> {
    Utc::now()
}

/// A request to anonymize one stored video.
///
/// Wire format matches the orchestrator's queue payload: camelCase field
/// names, with `jobId`, `bucket` and `originalObjectKey` required. Anything
/// else on the message is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnonymizeJob {
    /// Unique job ID (assigned by the orchestrator)
    pub job_id: JobId,

    /// Object store namespace holding the source video
    pub bucket: String,

    /// Key of the source video within the bucket
    pub original_object_key: String,

    /// When the job was enqueued (filled in if the producer omits it)
    #[serde(default = "default_enqueued_at")]
    pub enqueued_at: DateTime<Utc>,
}

impl AnonymizeJob {
    /// Create a new job for a stored video.
    pub fn new(bucket: impl Into<String>, original_object_key: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            bucket: bucket.into(),
            original_object_key: original_object_key.into(),
            enqueued_at: Utc::now(),
        }
    }

    /// Set an explicit job ID.
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = job_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_orchestrator_payload() {
        let payload = r#"{"jobId":"42","bucket":"videos","originalObjectKey":"clip.mp4"}"#;
        let job: AnonymizeJob = serde_json::from_str(payload).unwrap();

        assert_eq!(job.job_id.as_str(), "42");
        assert_eq!(job.bucket, "videos");
        assert_eq!(job.original_object_key, "clip.mp4");
    }

    #[test]
    fn missing_required_field_is_a_parse_failure() {
        let payload = r#"{"jobId":"42","bucket":"videos"}"#;
        assert!(serde_json::from_str::<AnonymizeJob>(payload).is_err());
    }

    #[test]
    fn wrong_typed_field_is_a_parse_failure() {
        let payload = r#"{"jobId":42,"bucket":"videos","originalObjectKey":"clip.mp4"}"#;
        assert!(serde_json::from_str::<AnonymizeJob>(payload).is_err());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload = r#"{"jobId":"42","bucket":"videos","originalObjectKey":"clip.mp4","priority":7}"#;
        let job: AnonymizeJob = serde_json::from_str(payload).unwrap();
        assert_eq!(job.bucket, "videos");
    }

    #[test]
    fn serializes_camel_case() {
        let job = AnonymizeJob::new("videos", "clip.mp4").with_job_id(JobId::from_string("42"));
        let json = serde_json::to_value(&job).unwrap();

        assert_eq!(json["jobId"], "42");
        assert_eq!(json["originalObjectKey"], "clip.mp4");
    }
}
