//! Resolution of bare identifiers against the client's default project.
//!
//! Facade methods accept either a bare id (`"samples"`) resolved in the
//! default project, or a full reference naming another project.

use tabula_domain::{DatasetReference, JobReference, TableReference};

pub trait IntoDataset {
    fn into_dataset(self, default_project: &str) -> DatasetReference;
}

impl IntoDataset for &str {
    fn into_dataset(self, default_project: &str) -> DatasetReference {
        DatasetReference::new(default_project, self)
    }
}

impl IntoDataset for String {
    fn into_dataset(self, default_project: &str) -> DatasetReference {
        DatasetReference::new(default_project, self)
    }
}

impl IntoDataset for DatasetReference {
    fn into_dataset(self, _: &str) -> DatasetReference {
        self
    }
}

impl IntoDataset for &DatasetReference {
    fn into_dataset(self, _: &str) -> DatasetReference {
        self.clone()
    }
}

pub trait IntoTable {
    fn into_table(self, default_project: &str) -> TableReference;
}

impl IntoTable for (&str, &str) {
    fn into_table(self, default_project: &str) -> TableReference {
        TableReference::new(default_project, self.0, self.1)
    }
}

impl IntoTable for TableReference {
    fn into_table(self, _: &str) -> TableReference {
        self
    }
}

impl IntoTable for &TableReference {
    fn into_table(self, _: &str) -> TableReference {
        self.clone()
    }
}

pub trait IntoJob {
    fn into_job(self, default_project: &str) -> JobReference;
}

impl IntoJob for &str {
    fn into_job(self, default_project: &str) -> JobReference {
        JobReference::new(default_project, self)
    }
}

impl IntoJob for JobReference {
    fn into_job(self, _: &str) -> JobReference {
        self
    }
}

impl IntoJob for &JobReference {
    fn into_job(self, _: &str) -> JobReference {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_ids_use_default_project() {
        assert_eq!("d".into_dataset("p"), DatasetReference::new("p", "d"));
        assert_eq!(("d", "t").into_table("p"), TableReference::new("p", "d", "t"));
        assert_eq!("j".into_job("p"), JobReference::new("p", "j"));
    }

    #[test]
    fn test_references_keep_their_project() {
        let table = TableReference::new("publicdata", "samples", "github_timeline");
        assert_eq!((&table).into_table("p").project_id, "publicdata");
        let dataset = DatasetReference::new("publicdata", "samples");
        assert_eq!(dataset.into_dataset("p").project_id, "publicdata");
    }
}
