//! Table operations

use serde_json::Value;
use tabula_core::TransportRequest;
use tabula_domain::{DatasetReference, Page, Result, Table, TableDefinition, TablePatch, TableReference};
use tracing::{debug, info};

use super::call::PreparedCall;
use super::target::{IntoDataset, IntoTable};
use super::WarehouseClient;

impl WarehouseClient {
    pub(crate) fn table_reference(&self, table: impl IntoTable) -> TableReference {
        table.into_table(&self.config.project_id)
    }

    pub(crate) fn tables_page_call(
        &self,
        dataset: &DatasetReference,
        page_token: Option<String>,
    ) -> PreparedCall<Page<Table>> {
        let request = TransportRequest::get(self.routes.tables(dataset))
            .with_optional_query(tabula_domain::constants::PAGE_TOKEN_PARAM, page_token);
        PreparedCall::listing(request, "tables")
    }

    pub(crate) fn table_call(&self, reference: &TableReference) -> PreparedCall<Option<Table>> {
        PreparedCall::optional(TransportRequest::get(self.routes.table(reference)))
    }

    pub(crate) fn insert_table_call(
        &self,
        reference: &TableReference,
        definition: &TableDefinition,
    ) -> Result<PreparedCall<Table>> {
        let body = Value::Object(definition.to_body(reference)?);
        let request = TransportRequest::post(self.routes.tables(&reference.dataset()), body);
        Ok(PreparedCall::decoded(request))
    }

    pub(crate) fn patch_table_call(
        &self,
        reference: &TableReference,
        patch: &TablePatch,
    ) -> Result<PreparedCall<Table>> {
        let body = Value::Object(patch.to_body()?);
        Ok(PreparedCall::decoded(TransportRequest::patch(self.routes.table(reference), body)))
    }

    pub(crate) fn delete_table_call(&self, reference: &TableReference) -> PreparedCall<bool> {
        PreparedCall::existence(TransportRequest::delete(self.routes.table(reference)))
    }

    /// Every table of a dataset.
    pub async fn tables(&self, dataset: impl IntoDataset) -> Result<Vec<Table>> {
        let reference = self.dataset_reference(dataset);
        let dataset_ref = &reference;
        let tables = self
            .paginator
            .list_all(move |token| self.run(self.tables_page_call(dataset_ref, token)))
            .await?;
        debug!(dataset = %reference, count = tables.len(), "tables listed");
        Ok(tables)
    }

    /// The table with its schema, or `None` when it does not exist.
    pub async fn table(&self, table: impl IntoTable) -> Result<Option<Table>> {
        let reference = self.table_reference(table);
        self.run(self.table_call(&reference)).await
    }

    /// Create a table (schema) or a view (view query).
    pub async fn insert_table(&self, table: impl IntoTable, definition: &TableDefinition) -> Result<Table> {
        let reference = self.table_reference(table);
        let created = self.run(self.insert_table_call(&reference, definition)?).await?;
        info!(table = %reference, kind = ?created.table_type, "table created");
        Ok(created)
    }

    pub async fn patch_table(&self, table: impl IntoTable, patch: &TablePatch) -> Result<Table> {
        let reference = self.table_reference(table);
        self.run(self.patch_table_call(&reference, patch)?).await
    }

    /// Delete a table. Returns `false` when it did not exist.
    pub async fn delete_table(&self, table: impl IntoTable) -> Result<bool> {
        let reference = self.table_reference(table);
        let deleted = self.run(self.delete_table_call(&reference)).await?;
        info!(table = %reference, deleted, "table delete");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tabula_core::testing::{error_body, ScriptedTransport};
    use tabula_core::{HttpMethod, RequestBody};
    use tabula_domain::{Config, Patch, TableFieldSchema, TableSchema};

    use super::*;

    fn client() -> (WarehouseClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        (WarehouseClient::new(Config::new("p"), transport.clone()), transport)
    }

    fn table_body(dataset: &str, table: &str) -> Value {
        json!({
            "tableReference": {"projectId": "p", "datasetId": dataset, "tableId": table},
            "type": "TABLE"
        })
    }

    fn sent_body(request: &TransportRequest) -> Value {
        match &request.body {
            RequestBody::Json(body) => body.clone(),
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tables_lists_every_page() {
        let (client, transport) = client();
        transport
            .push_json(200, json!({"tables": [table_body("d", "a")], "nextPageToken": "n"}))
            .push_json(200, json!({"tables": [table_body("d", "b")], "nextPageToken": ""}));

        let tables = client.tables("d").await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].table_reference.table_id, "b");
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_table_of_other_project() {
        let (client, transport) = client();
        transport.push_json(200, json!({
            "tableReference": {"projectId": "publicdata", "datasetId": "samples", "tableId": "wikipedia"},
            "schema": {"fields": [{"name": "title", "type": "STRING"}]},
            "numRows": "313797035"
        }));

        let reference = TableReference::new("publicdata", "samples", "wikipedia");
        let table = client.table(&reference).await.unwrap().unwrap();

        assert_eq!(table.num_rows.as_deref(), Some("313797035"));
        assert_eq!(
            transport.last_request().unwrap().path,
            "/bigquery/v2/projects/publicdata/datasets/samples/tables/wikipedia"
        );
    }

    #[tokio::test]
    async fn test_missing_table_is_none() {
        let (client, transport) = client();
        transport.push_json(404, error_body(404, "notFound", "Not found: Table p:d.t"));

        assert!(client.table(("d", "t")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_table_with_schema() {
        let (client, transport) = client();
        transport.push_json(200, table_body("d", "t"));

        let definition = TableDefinition {
            schema: Some(TableSchema::new(vec![TableFieldSchema::new("n", "INTEGER")])),
            expiration_time: Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
            ..TableDefinition::default()
        };
        client.insert_table(("d", "t"), &definition).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/bigquery/v2/projects/p/datasets/d/tables");
        let body = sent_body(&request);
        assert_eq!(body["tableReference"]["tableId"], "t");
        assert_eq!(body["schema"]["fields"][0]["name"], "n");
        assert_eq!(body["expirationTime"], "1700000000000");
    }

    #[tokio::test]
    async fn test_insert_view() {
        let (client, transport) = client();
        transport.push_json(200, json!({
            "tableReference": {"projectId": "p", "datasetId": "d", "tableId": "v"},
            "type": "VIEW",
            "view": {"query": "SELECT 1"}
        }));

        let definition = TableDefinition {
            view_query: Some("SELECT 1".to_string()),
            ..TableDefinition::default()
        };
        let view = client.insert_table(("d", "v"), &definition).await.unwrap();

        assert_eq!(view.table_type.as_deref(), Some("VIEW"));
        assert_eq!(sent_body(&transport.last_request().unwrap())["view"]["query"], "SELECT 1");
    }

    #[tokio::test]
    async fn test_patch_table_clears_with_null() {
        let (client, transport) = client();
        transport.push_json(200, table_body("d", "t"));

        let patch = TablePatch {
            friendly_name: Patch::Set("Friendly".to_string()),
            description: Patch::Clear,
            ..TablePatch::default()
        };
        client.patch_table(("d", "t"), &patch).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(sent_body(&request), json!({"friendlyName": "Friendly", "description": null}));
    }

    #[tokio::test]
    async fn test_delete_missing_table_is_false() {
        let (client, transport) = client();
        transport.push_json(404, error_body(404, "notFound", "Not found: Table p:d.gone"));

        assert!(!client.delete_table(("d", "gone")).await.unwrap());
    }
}
