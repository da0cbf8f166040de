//! Resource paths of the warehouse JSON API.

use std::borrow::Cow;

use tabula_domain::{DatasetReference, JobReference, TableReference};

fn segment(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Builds absolute request paths under a fixed API prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    prefix: String,
}

impl ApiRoutes {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self { prefix: prefix.trim_end_matches('/').to_string() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn project(&self, project_id: &str) -> String {
        format!("{}/projects/{}", self.prefix, segment(project_id))
    }

    pub fn datasets(&self, project_id: &str) -> String {
        format!("{}/datasets", self.project(project_id))
    }

    pub fn dataset(&self, dataset: &DatasetReference) -> String {
        format!("{}/{}", self.datasets(&dataset.project_id), segment(&dataset.dataset_id))
    }

    pub fn tables(&self, dataset: &DatasetReference) -> String {
        format!("{}/tables", self.dataset(dataset))
    }

    pub fn table(&self, table: &TableReference) -> String {
        format!("{}/{}", self.tables(&table.dataset()), segment(&table.table_id))
    }

    pub fn tabledata(&self, table: &TableReference) -> String {
        format!("{}/data", self.table(table))
    }

    pub fn insert_all(&self, table: &TableReference) -> String {
        format!("{}/insertAll", self.table(table))
    }

    pub fn jobs(&self, project_id: &str) -> String {
        format!("{}/jobs", self.project(project_id))
    }

    pub fn job(&self, job: &JobReference) -> String {
        format!("{}/{}", self.jobs(&job.project_id), segment(&job.job_id))
    }

    pub fn cancel_job(&self, job: &JobReference) -> String {
        format!("{}/cancel", self.job(job))
    }
}
