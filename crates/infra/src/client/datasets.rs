//! Dataset operations

use serde_json::{json, Value};
use tabula_core::TransportRequest;
use tabula_domain::{Dataset, DatasetPatch, DatasetReference, Page, Result};
use tracing::{debug, info};

use super::call::PreparedCall;
use super::target::IntoDataset;
use super::WarehouseClient;

impl WarehouseClient {
    pub(crate) fn dataset_reference(&self, dataset: impl IntoDataset) -> DatasetReference {
        dataset.into_dataset(&self.config.project_id)
    }

    pub(crate) fn datasets_page_call(
        &self,
        project_id: &str,
        all: bool,
        page_token: Option<String>,
    ) -> PreparedCall<Page<Dataset>> {
        let mut request = TransportRequest::get(self.routes.datasets(project_id))
            .with_optional_query(tabula_domain::constants::PAGE_TOKEN_PARAM, page_token);
        if all {
            request = request.with_query("all", true);
        }
        PreparedCall::listing(request, "datasets")
    }

    pub(crate) fn dataset_call(&self, reference: &DatasetReference) -> PreparedCall<Option<Dataset>> {
        PreparedCall::optional(TransportRequest::get(self.routes.dataset(reference)))
    }

    pub(crate) fn insert_dataset_call(&self, reference: &DatasetReference) -> PreparedCall<Dataset> {
        let body = json!({ "datasetReference": reference });
        PreparedCall::decoded(TransportRequest::post(self.routes.datasets(&reference.project_id), body))
    }

    pub(crate) fn patch_dataset_call(
        &self,
        reference: &DatasetReference,
        patch: &DatasetPatch,
    ) -> Result<PreparedCall<Dataset>> {
        let body = Value::Object(patch.to_body()?);
        Ok(PreparedCall::decoded(TransportRequest::patch(self.routes.dataset(reference), body)))
    }

    pub(crate) fn delete_dataset_call(
        &self,
        reference: &DatasetReference,
        delete_contents: bool,
    ) -> PreparedCall<bool> {
        let mut request = TransportRequest::delete(self.routes.dataset(reference));
        if delete_contents {
            request = request.with_query("deleteContents", true);
        }
        PreparedCall::existence(request)
    }

    /// Every dataset of `project` (the default project when `None`).
    /// `all` includes hidden datasets.
    pub async fn datasets(&self, project: Option<&str>, all: bool) -> Result<Vec<Dataset>> {
        let project_id = project.unwrap_or(&self.config.project_id);
        let datasets = self
            .paginator
            .list_all(move |token| self.run(self.datasets_page_call(project_id, all, token)))
            .await?;
        debug!(project = project_id, count = datasets.len(), "datasets listed");
        Ok(datasets)
    }

    /// The dataset, or `None` when it does not exist.
    pub async fn dataset(&self, dataset: impl IntoDataset) -> Result<Option<Dataset>> {
        let reference = self.dataset_reference(dataset);
        self.run(self.dataset_call(&reference)).await
    }

    pub async fn insert_dataset(&self, dataset: impl IntoDataset) -> Result<Dataset> {
        let reference = self.dataset_reference(dataset);
        let created = self.run(self.insert_dataset_call(&reference)).await?;
        info!(dataset = %reference, "dataset created");
        Ok(created)
    }

    /// Update the fields set in `patch`; [`tabula_domain::Patch::Clear`]
    /// sends `null`.
    pub async fn patch_dataset(&self, dataset: impl IntoDataset, patch: &DatasetPatch) -> Result<Dataset> {
        let reference = self.dataset_reference(dataset);
        self.run(self.patch_dataset_call(&reference, patch)?).await
    }

    /// Delete a dataset. Returns `false` when it did not exist. Deleting a
    /// non-empty dataset needs `delete_contents`.
    pub async fn delete_dataset(&self, dataset: impl IntoDataset, delete_contents: bool) -> Result<bool> {
        let reference = self.dataset_reference(dataset);
        let deleted = self.run(self.delete_dataset_call(&reference, delete_contents)).await?;
        info!(dataset = %reference, deleted, "dataset delete");
        Ok(deleted)
    }
}
