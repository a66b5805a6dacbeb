//! Job outcome reported to the orchestrator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// The durable result of a successfully processed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    /// The job this outcome belongs to
    pub job_id: JobId,
    /// Key of the published anonymized artifact
    pub processed_object_key: String,
}

impl JobOutcome {
    pub fn new(job_id: JobId, processed_object_key: impl Into<String>) -> Self {
        Self {
            job_id,
            processed_object_key: processed_object_key.into(),
        }
    }

    /// Body for the orchestrator completion call.
    pub fn report(&self) -> CompletionReport {
        CompletionReport {
            processed_object_key: self.processed_object_key.clone(),
        }
    }
}

/// JSON body POSTed to `{orchestratorBase}/videos/{jobId}/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub processed_object_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_body_shape() {
        let outcome = JobOutcome::new(JobId::from_string("42"), "processed/clip.mp4");
        let json = serde_json::to_value(outcome.report()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"processedObjectKey": "processed/clip.mp4"})
        );
    }
}
