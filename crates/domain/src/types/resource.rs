//! Dataset and table resources
//!
//! Only the fields the client reads are typed; everything else the service
//! returns is kept in `extra` so callers can still reach it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::reference::{DatasetReference, TableReference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub dataset_reference: DatasetReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_table_expiration_ms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFieldSchema {
    pub name: String,
    /// Column type, e.g. `STRING`, `INTEGER`, `RECORD`.
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// `NULLABLE`, `REQUIRED` or `REPEATED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self { name: name.into(), field_type: field_type.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Nested record column.
    pub fn record(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self { name: name.into(), field_type: "RECORD".to_string(), fields, ..Self::default() }
    }

    pub fn is_repeated(&self) -> bool {
        self.mode.as_deref().is_some_and(|mode| mode.eq_ignore_ascii_case("REPEATED"))
    }

    pub fn is_record(&self) -> bool {
        self.field_type.eq_ignore_ascii_case("RECORD") || self.field_type.eq_ignore_ascii_case("STRUCT")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableSchema {
    pub const fn new(fields: Vec<TableFieldSchema>) -> Self {
        Self { fields }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_legacy_sql: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub table_reference: TableReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `TABLE`, `VIEW` or `EXTERNAL`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub table_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewDefinition>,
    /// Milliseconds since the epoch, encoded as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of table rows decoded into column-name keyed maps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub total_rows: u64,
    pub next_token: Option<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_keeps_unknown_fields() {
        let table: Table = serde_json::from_value(serde_json::json!({
            "kind": "bigquery#table",
            "id": "publicdata:samples.github_timeline",
            "tableReference": {
                "projectId": "publicdata",
                "datasetId": "samples",
                "tableId": "github_timeline"
            },
            "type": "TABLE",
            "creationTime": "1335916040125"
        }))
        .unwrap();

        assert_eq!(table.table_type.as_deref(), Some("TABLE"));
        assert_eq!(table.table_reference.table_id, "github_timeline");
        assert_eq!(table.extra.get("kind"), Some(&Value::from("bigquery#table")));
        assert!(table.extra.contains_key("creationTime"));
    }

    #[test]
    fn test_field_schema_wire_names() {
        let field = TableFieldSchema::new("n", "INTEGER").with_mode("NULLABLE");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json, serde_json::json!({"name": "n", "type": "INTEGER", "mode": "NULLABLE"}));
    }

    #[test]
    fn test_record_and_repeated_detection() {
        let record = TableFieldSchema::record("addr", vec![TableFieldSchema::new("city", "STRING")])
            .with_mode("REPEATED");
        assert!(record.is_record());
        assert!(record.is_repeated());
        assert!(!TableFieldSchema::new("s", "STRING").is_repeated());
    }
}
