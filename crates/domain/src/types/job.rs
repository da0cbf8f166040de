//! Job model
//!
//! A job is a server-tracked asynchronous operation (query, load, extract or
//! copy). Its state only ever changes by re-reading it from the service:
//! nothing here infers transitions locally.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::reference::{DatasetReference, JobReference, TableReference};
use super::resource::TableSchema;
use crate::impl_wire_enum_conversions;

/// Lifecycle state: `PENDING -> RUNNING -> DONE`. `DONE` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Done,
}

impl_wire_enum_conversions!(JobState {
    Pending => "PENDING",
    Running => "RUNNING",
    Done => "DONE",
});

impl JobState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    WriteTruncate,
    WriteAppend,
    WriteEmpty,
}

impl_wire_enum_conversions!(WriteDisposition {
    WriteTruncate => "WRITE_TRUNCATE",
    WriteAppend => "WRITE_APPEND",
    WriteEmpty => "WRITE_EMPTY",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateDisposition {
    CreateIfNeeded,
    CreateNever,
}

impl_wire_enum_conversions!(CreateDisposition {
    CreateIfNeeded => "CREATE_IF_NEEDED",
    CreateNever => "CREATE_NEVER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Interactive,
    Batch,
}

impl_wire_enum_conversions!(Priority {
    Interactive => "INTERACTIVE",
    Batch => "BATCH",
});

/// File format for loads and extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFormat {
    Csv,
    NewlineDelimitedJson,
    Avro,
    Parquet,
    DatastoreBackup,
}

impl_wire_enum_conversions!(DataFormat {
    Csv => "CSV",
    NewlineDelimitedJson => "NEWLINE_DELIMITED_JSON",
    Avro => "AVRO",
    Parquet => "PARQUET",
    DatastoreBackup => "DATASTORE_BACKUP",
});

/// Error entry as reported inside a job status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub state: JobState,
    /// Final error of a `DONE` job. Present means the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_result: Option<ErrorProto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinedFunctionResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
}

impl UserDefinedFunctionResource {
    /// Inline code, or a URI when the resource starts with `gs://`.
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        if source.starts_with("gs://") {
            Self { inline_code: None, resource_uri: Some(source) }
        } else {
            Self { inline_code: Some(source), resource_uri: None }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfiguration {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_table: Option<TableReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dataset: Option<DatasetReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_disposition: Option<WriteDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_disposition: Option<CreateDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_large_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flatten_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_legacy_sql: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_query_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_defined_function_resources: Vec<UserDefinedFunctionResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_billing_tier: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfiguration {
    pub destination_table: TableReference,
    #[serde(default)]
    pub source_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<DataFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_disposition: Option<WriteDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_disposition: Option<CreateDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_jagged_rows: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_quoted_newlines: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_unknown_values: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bad_records: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_leading_rows: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConfiguration {
    pub source_table: TableReference,
    pub destination_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_format: Option<DataFormat>,
    /// `NONE` or `GZIP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_header: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyConfiguration {
    pub source_tables: Vec<TableReference>,
    pub destination_table: TableReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_disposition: Option<WriteDisposition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_disposition: Option<CreateDisposition>,
}

/// Which kind of work a configuration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Query,
    Load,
    Extract,
    Copy,
    Unknown,
}

/// Job configuration. Exactly one of the variant fields is expected to be
/// set; the wire format keeps them as sibling keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl JobConfiguration {
    pub fn query(config: QueryConfiguration) -> Self {
        Self { query: Some(config), ..Self::default() }
    }

    pub fn load(config: LoadConfiguration) -> Self {
        Self { load: Some(config), ..Self::default() }
    }

    pub fn extract(config: ExtractConfiguration) -> Self {
        Self { extract: Some(config), ..Self::default() }
    }

    pub fn copy(config: CopyConfiguration) -> Self {
        Self { copy: Some(config), ..Self::default() }
    }

    pub const fn kind(&self) -> JobKind {
        if self.query.is_some() {
            JobKind::Query
        } else if self.load.is_some() {
            JobKind::Load
        } else if self.extract.is_some() {
            JobKind::Extract
        } else if self.copy.is_some() {
            JobKind::Copy
        } else {
            JobKind::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes_processed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes_billed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,
}

/// Timing and volume figures. The service encodes int64 values as strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes_processed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryStatistics>,
}

impl JobStatistics {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.creation_time.as_deref())
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.start_time.as_deref())
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.end_time.as_deref())
    }
}

fn millis_to_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let millis = raw?.parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

/// Job as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_reference: JobReference,
    #[serde(default)]
    pub configuration: JobConfiguration,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<JobStatistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl Job {
    pub const fn state(&self) -> JobState {
        self.status.state
    }

    pub const fn is_done(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Final error of a finished job, if it failed.
    pub const fn error_result(&self) -> Option<&ErrorProto> {
        self.status.error_result.as_ref()
    }
}
