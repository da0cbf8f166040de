//! Stable identifiers for projects, datasets, tables and jobs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a job, returned as soon as the service accepts a submission.
///
/// Immutable and valid for polling for as long as the service retains the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl JobReference {
    pub fn new(project_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), job_id: job_id.into(), location: None }
    }

    /// Reference with a client-generated job id.
    pub fn generate(project_id: impl Into<String>) -> Self {
        Self::new(project_id, format!("tabula_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for JobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.job_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub project_id: String,
    pub dataset_id: String,
}

impl DatasetReference {
    pub fn new(project_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into(), dataset_id: dataset_id.into() }
    }
}

impl fmt::Display for DatasetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.project_id, self.dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableReference {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Dataset the table belongs to.
    pub fn dataset(&self) -> DatasetReference {
        DatasetReference::new(&self.project_id, &self.dataset_id)
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_reference_wire_format() {
        let reference = JobReference::new("my-project", "job_42");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json, serde_json::json!({"projectId": "my-project", "jobId": "job_42"}));

        let parsed: JobReference = serde_json::from_value(serde_json::json!({
            "projectId": "p",
            "jobId": "j",
            "location": "US"
        }))
        .unwrap();
        assert_eq!(parsed.location.as_deref(), Some("US"));
    }

    #[test]
    fn test_generated_job_ids_are_unique() {
        let a = JobReference::generate("p");
        let b = JobReference::generate("p");
        assert_ne!(a.job_id, b.job_id);
        assert!(a.job_id.starts_with("tabula_"));
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(TableReference::new("pub", "samples", "gsod").to_string(), "pub:samples.gsod");
        assert_eq!(DatasetReference::new("pub", "samples").to_string(), "pub:samples");
        assert_eq!(JobReference::new("p", "j").to_string(), "p:j");
    }
}
