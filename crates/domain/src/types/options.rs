//! Options for facade operations
//!
//! Each options struct knows how to render itself into the request body or
//! job configuration the service expects.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::job::{
    CopyConfiguration, CreateDisposition, DataFormat, ExtractConfiguration, JobConfiguration,
    JobState, LoadConfiguration, Priority, QueryConfiguration, UserDefinedFunctionResource,
    WriteDisposition,
};
use super::reference::{DatasetReference, TableReference};
use super::resource::TableSchema;

/// Field update in a PATCH request.
///
/// `Unchanged` omits the key, `Clear` sends an explicit `null`, `Set` sends
/// the value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    fn write_to<U: Serialize>(
        &self,
        body: &mut Map<String, Value>,
        key: &str,
        render: impl FnOnce(&T) -> U,
    ) -> serde_json::Result<()> {
        match self {
            Self::Unchanged => {}
            Self::Clear => {
                body.insert(key.to_string(), Value::Null);
            }
            Self::Set(value) => {
                body.insert(key.to_string(), serde_json::to_value(render(value))?);
            }
        }
        Ok(())
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

fn millis_string(at: &DateTime<Utc>) -> String {
    at.timestamp_millis().to_string()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetPatch {
    pub access: Patch<Vec<Value>>,
    pub description: Patch<String>,
    pub default_table_expiration_ms: Patch<u64>,
    pub friendly_name: Patch<String>,
}

impl DatasetPatch {
    pub fn to_body(&self) -> serde_json::Result<Map<String, Value>> {
        let mut body = Map::new();
        self.access.write_to(&mut body, "access", Clone::clone)?;
        self.description.write_to(&mut body, "description", Clone::clone)?;
        self.default_table_expiration_ms.write_to(
            &mut body,
            "defaultTableExpirationMs",
            ToString::to_string,
        )?;
        self.friendly_name.write_to(&mut body, "friendlyName", Clone::clone)?;
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TablePatch {
    pub friendly_name: Patch<String>,
    pub description: Patch<String>,
    pub expiration_time: Patch<DateTime<Utc>>,
}

impl TablePatch {
    pub fn to_body(&self) -> serde_json::Result<Map<String, Value>> {
        let mut body = Map::new();
        self.friendly_name.write_to(&mut body, "friendlyName", Clone::clone)?;
        self.description.write_to(&mut body, "description", Clone::clone)?;
        self.expiration_time.write_to(&mut body, "expirationTime", millis_string)?;
        Ok(body)
    }
}

/// Definition of a new table: either a schema-backed table or a view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableDefinition {
    pub schema: Option<TableSchema>,
    pub view_query: Option<String>,
    pub use_legacy_sql: Option<bool>,
    pub friendly_name: Option<String>,
    pub description: Option<String>,
    pub expiration_time: Option<DateTime<Utc>>,
}

impl TableDefinition {
    pub fn to_body(&self, reference: &TableReference) -> serde_json::Result<Map<String, Value>> {
        let mut body = Map::new();
        body.insert("tableReference".to_string(), serde_json::to_value(reference)?);
        if let Some(schema) = &self.schema {
            body.insert("schema".to_string(), serde_json::to_value(schema)?);
        }
        if let Some(query) = &self.view_query {
            let mut view = Map::new();
            view.insert("query".to_string(), Value::from(query.clone()));
            if let Some(legacy) = self.use_legacy_sql {
                view.insert("useLegacySql".to_string(), Value::from(legacy));
            }
            body.insert("view".to_string(), Value::Object(view));
        }
        if let Some(name) = &self.friendly_name {
            body.insert("friendlyName".to_string(), Value::from(name.clone()));
        }
        if let Some(description) = &self.description {
            body.insert("description".to_string(), Value::from(description.clone()));
        }
        if let Some(expiration) = &self.expiration_time {
            body.insert("expirationTime".to_string(), Value::from(millis_string(expiration)));
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableDataOptions {
    pub start_index: Option<u64>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
    /// Schema used to name columns. Fetched from the table when absent.
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertOptions {
    pub skip_invalid_rows: bool,
    pub ignore_unknown_values: bool,
    pub template_suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub destination: Option<TableReference>,
    pub default_dataset: Option<DatasetReference>,
    pub write_disposition: Option<WriteDisposition>,
    pub create_disposition: Option<CreateDisposition>,
    pub allow_large_results: Option<bool>,
    pub flatten_results: Option<bool>,
    pub priority: Option<Priority>,
    pub use_legacy_sql: Option<bool>,
    pub use_query_cache: Option<bool>,
    /// Inline UDF code or `gs://` URIs.
    pub user_defined_function_resources: Vec<String>,
    pub maximum_billing_tier: Option<u32>,
    pub dry_run: bool,
    pub job_id: Option<String>,
    /// Wait for completion up to this long after submitting.
    pub wait: Option<Duration>,
}

impl QueryOptions {
    pub fn to_configuration(&self, sql: &str) -> JobConfiguration {
        let query = QueryConfiguration {
            query: sql.to_string(),
            destination_table: self.destination.clone(),
            default_dataset: self.default_dataset.clone(),
            write_disposition: self.write_disposition,
            create_disposition: self.create_disposition,
            allow_large_results: self.allow_large_results,
            flatten_results: self.flatten_results,
            priority: self.priority,
            use_legacy_sql: self.use_legacy_sql,
            use_query_cache: self.use_query_cache,
            user_defined_function_resources: self
                .user_defined_function_resources
                .iter()
                .map(|source| UserDefinedFunctionResource::from_source(source.clone()))
                .collect(),
            maximum_billing_tier: self.maximum_billing_tier,
        };
        JobConfiguration { dry_run: self.dry_run.then_some(true), ..JobConfiguration::query(query) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub source_uris: Vec<String>,
    pub schema: Option<TableSchema>,
    pub source_format: Option<DataFormat>,
    pub write_disposition: Option<WriteDisposition>,
    pub create_disposition: Option<CreateDisposition>,
    pub field_delimiter: Option<String>,
    pub quote: Option<String>,
    pub encoding: Option<String>,
    pub allow_jagged_rows: Option<bool>,
    pub allow_quoted_newlines: Option<bool>,
    pub ignore_unknown_values: Option<bool>,
    pub max_bad_records: Option<u32>,
    pub skip_leading_rows: Option<u32>,
    pub dry_run: bool,
    pub job_id: Option<String>,
    pub wait: Option<Duration>,
}

impl LoadOptions {
    pub fn to_configuration(&self, destination: TableReference) -> JobConfiguration {
        let load = LoadConfiguration {
            destination_table: destination,
            source_uris: self.source_uris.clone(),
            schema: self.schema.clone(),
            source_format: self.source_format,
            write_disposition: self.write_disposition,
            create_disposition: self.create_disposition,
            field_delimiter: self.field_delimiter.clone(),
            quote: self.quote.clone(),
            encoding: self.encoding.clone(),
            allow_jagged_rows: self.allow_jagged_rows,
            allow_quoted_newlines: self.allow_quoted_newlines,
            ignore_unknown_values: self.ignore_unknown_values,
            max_bad_records: self.max_bad_records,
            skip_leading_rows: self.skip_leading_rows,
        };
        JobConfiguration { dry_run: self.dry_run.then_some(true), ..JobConfiguration::load(load) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractOptions {
    pub destination_format: Option<DataFormat>,
    pub compression: Option<String>,
    pub field_delimiter: Option<String>,
    pub print_header: Option<bool>,
    pub dry_run: bool,
    pub job_id: Option<String>,
    pub wait: Option<Duration>,
}

impl ExtractOptions {
    pub fn to_configuration(
        &self,
        source: TableReference,
        destination_uris: Vec<String>,
    ) -> JobConfiguration {
        let extract = ExtractConfiguration {
            source_table: source,
            destination_uris,
            destination_format: self.destination_format,
            compression: self.compression.clone(),
            field_delimiter: self.field_delimiter.clone(),
            print_header: self.print_header,
        };
        JobConfiguration {
            dry_run: self.dry_run.then_some(true),
            ..JobConfiguration::extract(extract)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyOptions {
    pub write_disposition: Option<WriteDisposition>,
    pub create_disposition: Option<CreateDisposition>,
    pub dry_run: bool,
    pub job_id: Option<String>,
    pub wait: Option<Duration>,
}

impl CopyOptions {
    pub fn to_configuration(
        &self,
        sources: Vec<TableReference>,
        destination: TableReference,
    ) -> JobConfiguration {
        let copy = CopyConfiguration {
            source_tables: sources,
            destination_table: destination,
            write_disposition: self.write_disposition,
            create_disposition: self.create_disposition,
        };
        JobConfiguration { dry_run: self.dry_run.then_some(true), ..JobConfiguration::copy(copy) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListJobsOptions {
    pub project_id: Option<String>,
    pub all_users: bool,
    pub state_filter: Vec<JobState>,
    /// `full` or `minimal`.
    pub projection: Option<String>,
    pub max_results: Option<u32>,
}
