//! Table data: paged reads and streaming inserts

use serde::Serialize;
use serde_json::{json, Map, Value};
use tabula_core::TransportRequest;
use tabula_domain::{
    ApiError, InsertOptions, Reason, Result, TableData, TableDataOptions, TableReference,
    TableSchema, TabulaError,
};
use tracing::{debug, instrument, warn};

use super::call::PreparedCall;
use super::rows::decode_table_data;
use super::target::IntoTable;
use super::WarehouseClient;

/// Summary of `insertErrors`, or `None` when every row was accepted.
fn insert_failure(response: &Value, origin: &str) -> Option<ApiError> {
    let failures = response.get("insertErrors")?.as_array().filter(|errors| !errors.is_empty())?;

    let first = failures
        .iter()
        .flat_map(|failure| failure.get("errors").and_then(Value::as_array).into_iter().flatten())
        .next();
    let reason = first
        .and_then(|error| error.get("reason"))
        .and_then(Value::as_str)
        .unwrap_or("invalid");
    let detail = first
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .unwrap_or(reason);

    let message = format!("{} row(s) rejected: {detail}", failures.len());
    Some(ApiError::new(Reason::Invalid, message, origin))
}

impl WarehouseClient {
    pub(crate) fn tabledata_call(
        &self,
        reference: &TableReference,
        options: &TableDataOptions,
        schema: TableSchema,
    ) -> PreparedCall<TableData> {
        let request = TransportRequest::get(self.routes.tabledata(reference))
            .with_optional_query("startIndex", options.start_index)
            .with_optional_query("maxResults", options.max_results)
            .with_optional_query(
                tabula_domain::constants::PAGE_TOKEN_PARAM,
                options.page_token.as_deref(),
            );
        PreparedCall::new(request, move |result| decode_table_data(&result?, &schema.fields))
    }

    pub(crate) fn insert_tabledata_call<R: Serialize>(
        &self,
        reference: &TableReference,
        rows: &[R],
        options: &InsertOptions,
    ) -> Result<PreparedCall<()>> {
        let rows = rows
            .iter()
            .map(|row| -> Result<Value> { Ok(json!({ "json": serde_json::to_value(row)? })) })
            .collect::<Result<Vec<_>>>()?;

        let mut body = Map::new();
        body.insert("rows".to_string(), Value::Array(rows));
        if options.skip_invalid_rows {
            body.insert("skipInvalidRows".to_string(), Value::Bool(true));
        }
        if options.ignore_unknown_values {
            body.insert("ignoreUnknownValues".to_string(), Value::Bool(true));
        }
        if let Some(suffix) = &options.template_suffix {
            body.insert("templateSuffix".to_string(), Value::from(suffix.as_str()));
        }

        let origin = self.routes.insert_all(reference);
        let request = TransportRequest::post(origin.clone(), Value::Object(body));
        Ok(PreparedCall::new(request, move |result| match insert_failure(&result?, &origin) {
            Some(err) => {
                warn!(origin = %origin, message = %err.message, "rows rejected");
                Err(err.into())
            }
            None => Ok(()),
        }))
    }

    /// Read one page of rows.
    ///
    /// Columns are named from `options.schema`; without it the table is
    /// fetched first to learn its schema. Cell values are returned as the
    /// service encodes them (scalars are strings).
    #[instrument(skip_all)]
    pub async fn list_tabledata(&self, table: impl IntoTable, options: &TableDataOptions) -> Result<TableData> {
        let reference = self.table_reference(table);
        let schema = match &options.schema {
            Some(schema) => schema.clone(),
            None => self.table_schema(&reference).await?,
        };
        let data = self.run(self.tabledata_call(&reference, options, schema)).await?;
        debug!(table = %reference, rows = data.rows.len(), total = data.total_rows, "table data read");
        Ok(data)
    }

    /// Stream rows into a table. Any rejected row fails the call with reason
    /// `invalid`; rows the service accepted stay inserted.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub async fn insert_tabledata<R: Serialize>(
        &self,
        table: impl IntoTable,
        rows: &[R],
        options: &InsertOptions,
    ) -> Result<()> {
        let reference = self.table_reference(table);
        self.run(self.insert_tabledata_call(&reference, rows, options)?).await?;
        debug!(table = %reference, "rows inserted");
        Ok(())
    }

    async fn table_schema(&self, reference: &TableReference) -> Result<TableSchema> {
        match self.run(self.table_call(reference)).await? {
            Some(table) => Ok(table.schema.unwrap_or_default()),
            None => Err(TabulaError::Api(ApiError::new(
                Reason::NotFound,
                format!("Not found: Table {reference}"),
                self.routes.table(reference),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tabula_core::testing::{error_body, ScriptedTransport};
    use tabula_core::RequestBody;
    use tabula_domain::{Config, TableFieldSchema};

    use super::*;

    fn client() -> (WarehouseClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        (WarehouseClient::new(Config::new("p"), transport.clone()), transport)
    }

    fn table_with_schema() -> Value {
        json!({
            "tableReference": {"projectId": "p", "datasetId": "d", "tableId": "t"},
            "schema": {"fields": [
                {"name": "n", "type": "INTEGER"},
                {"name": "s", "type": "STRING"}
            ]}
        })
    }

    #[tokio::test]
    async fn test_list_fetches_schema_when_absent() {
        let (client, transport) = client();
        transport.push_json(200, table_with_schema()).push_json(
            200,
            json!({"totalRows": "1", "rows": [{"f": [{"v": "42"}, {"v": "Hello, World!"}]}]}),
        );

        let options = TableDataOptions { max_results: Some(10), ..TableDataOptions::default() };
        let data = client.list_tabledata(("d", "t"), &options).await.unwrap();

        assert_eq!(data.total_rows, 1);
        assert_eq!(data.rows[0]["n"], "42");
        assert_eq!(data.rows[0]["s"], "Hello, World!");

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/bigquery/v2/projects/p/datasets/d/tables/t");
        assert_eq!(requests[1].path, "/bigquery/v2/projects/p/datasets/d/tables/t/data");
        assert!(requests[1].query.contains(&("maxResults".to_string(), "10".to_string())));
    }

    #[tokio::test]
    async fn test_list_with_supplied_schema_skips_fetch() {
        let (client, transport) = client();
        transport.push_json(200, json!({"totalRows": "0"}));

        let options = TableDataOptions {
            schema: Some(TableSchema::new(vec![TableFieldSchema::new("a", "STRING")])),
            page_token: Some("tok".to_string()),
            ..TableDataOptions::default()
        };
        let data = client.list_tabledata(("d", "t"), &options).await.unwrap();

        assert_eq!(data, TableData { total_rows: 0, next_token: None, rows: vec![] });
        assert_eq!(transport.request_count(), 1);
        assert!(transport.requests()[0]
            .query
            .contains(&("pageToken".to_string(), "tok".to_string())));
    }

    #[tokio::test]
    async fn test_list_missing_table_is_not_found() {
        let (client, transport) = client();
        transport.push_json(404, error_body(404, "notFound", "Not found"));

        let err = client.list_tabledata(("d", "gone"), &TableDataOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_wraps_rows() {
        let (client, transport) = client();
        transport.push_json(200, json!({"kind": "bigquery#tableDataInsertAllResponse"}));

        let rows = vec![json!({"n": 1}), json!({"n": 2})];
        let options = InsertOptions { skip_invalid_rows: true, ..InsertOptions::default() };
        client.insert_tabledata(("d", "t"), &rows, &options).await.unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.path, "/bigquery/v2/projects/p/datasets/d/tables/t/insertAll");
        let RequestBody::Json(body) = request.body else { panic!("expected JSON body") };
        assert_eq!(
            body,
            json!({"rows": [{"json": {"n": 1}}, {"json": {"n": 2}}], "skipInvalidRows": true})
        );
    }

    #[tokio::test]
    async fn test_insert_errors_surface_as_invalid() {
        let (client, transport) = client();
        transport.push_json(200, json!({
            "insertErrors": [
                {"index": 1, "errors": [{"reason": "invalid", "message": "no such field: x"}]}
            ]
        }));

        let err = client
            .insert_tabledata(("d", "t"), &[json!({"x": 1})], &InsertOptions::default())
            .await
            .unwrap_err();

        let api = err.api_error().unwrap();
        assert_eq!(api.reason, Reason::Invalid);
        assert!(api.message.contains("no such field: x"));
    }

    #[test]
    fn test_empty_insert_errors_mean_success() {
        assert!(insert_failure(&json!({"insertErrors": []}), "/x").is_none());
        assert!(insert_failure(&Value::Null, "/x").is_none());
    }
}
