//! Table data decoding
//!
//! The service returns rows as `{"f": [{"v": ...}, ...]}` with cells in
//! schema order. Nested records repeat the same shape; repeated columns hold
//! an array of `{"v": ...}` cells. Leaf values are passed through unchanged
//! (the service encodes scalars as strings).

use serde_json::{Map, Value};
use tabula_domain::{Result, TableData, TableFieldSchema, TabulaError};

/// Decode a `tabledata.list` response using the table's column list.
pub fn decode_table_data(response: &Value, fields: &[TableFieldSchema]) -> Result<TableData> {
    let total_rows = match response.get("totalRows") {
        None | Some(Value::Null) => 0,
        Some(Value::String(raw)) => raw
            .parse::<u64>()
            .map_err(|err| malformed(format!("totalRows {raw:?} is not a count: {err}")))?,
        Some(Value::Number(n)) => {
            n.as_u64().ok_or_else(|| malformed(format!("totalRows {n} is not a count")))?
        }
        Some(other) => return Err(malformed(format!("unexpected totalRows {other}"))),
    };

    let next_token = response
        .get("pageToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    let rows = match response.get("rows") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => {
            rows.iter().map(|row| decode_record(row, fields)).collect::<Result<_>>()?
        }
        Some(other) => return Err(malformed(format!("rows is not an array: {other}"))),
    };

    Ok(TableData { total_rows, next_token, rows })
}

fn decode_record(record: &Value, fields: &[TableFieldSchema]) -> Result<Map<String, Value>> {
    let cells = record
        .get("f")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed(format!("row without cells: {record}")))?;

    fields
        .iter()
        .zip(cells)
        .map(|(field, cell)| {
            let value = cell.get("v").unwrap_or(&Value::Null);
            Ok((field.name.clone(), decode_cell(field, value)?))
        })
        .collect()
}

fn decode_cell(field: &TableFieldSchema, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if !field.is_repeated() {
        return decode_single(field, value);
    }

    let items = value
        .as_array()
        .ok_or_else(|| malformed(format!("repeated column {} is not an array", field.name)))?;
    items
        .iter()
        .map(|item| decode_single(field, item.get("v").unwrap_or(&Value::Null)))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn decode_single(field: &TableFieldSchema, value: &Value) -> Result<Value> {
    if field.is_record() && !value.is_null() {
        decode_record(value, &field.fields).map(Value::Object)
    } else {
        Ok(value.clone())
    }
}

fn malformed(message: String) -> TabulaError {
    TabulaError::MalformedResponse(format!("table data: {message}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn field(name: &str, field_type: &str) -> TableFieldSchema {
        TableFieldSchema::new(name, field_type)
    }

    #[test]
    fn test_flat_rows() {
        let response = json!({
            "totalRows": "1",
            "rows": [{"f": [{"v": "42"}, {"v": "Hello, World!"}]}]
        });
        let data = decode_table_data(&response, &[field("n", "INTEGER"), field("s", "STRING")]).unwrap();

        assert_eq!(data.total_rows, 1);
        assert_eq!(data.next_token, None);
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.rows[0]["n"], "42");
        assert_eq!(data.rows[0]["s"], "Hello, World!");
    }

    #[test]
    fn test_empty_table() {
        let data = decode_table_data(&json!({"totalRows": "0"}), &[field("a", "STRING")]).unwrap();
        assert_eq!(data, TableData { total_rows: 0, next_token: None, rows: vec![] });
    }

    #[test]
    fn test_nested_and_repeated_columns() {
        let fields = vec![
            field("name", "STRING"),
            TableFieldSchema::record("address", vec![field("city", "STRING"), field("zip", "STRING")]),
            field("tags", "STRING").with_mode("REPEATED"),
            TableFieldSchema::record("visits", vec![field("at", "TIMESTAMP")]).with_mode("REPEATED"),
        ];
        let response = json!({
            "totalRows": "2",
            "pageToken": "next-1",
            "rows": [{
                "f": [
                    {"v": "ann"},
                    {"v": {"f": [{"v": "Oslo"}, {"v": null}]}},
                    {"v": [{"v": "a"}, {"v": "b"}]},
                    {"v": [{"v": {"f": [{"v": "1.5E9"}]}}]}
                ]
            }]
        });

        let data = decode_table_data(&response, &fields).unwrap();
        let row = &data.rows[0];

        assert_eq!(data.next_token.as_deref(), Some("next-1"));
        assert_eq!(row["address"], json!({"city": "Oslo", "zip": null}));
        assert_eq!(row["tags"], json!(["a", "b"]));
        assert_eq!(row["visits"], json!([{"at": "1.5E9"}]));
    }

    #[test]
    fn test_null_cells_and_missing_v() {
        let response = json!({"totalRows": 1, "rows": [{"f": [{"v": null}, {}]}]});
        let data = decode_table_data(&response, &[field("a", "STRING"), field("b", "STRING")]).unwrap();
        assert_eq!(data.rows[0]["a"], Value::Null);
        assert_eq!(data.rows[0]["b"], Value::Null);
    }

    #[test]
    fn test_bad_shapes_are_malformed() {
        let err = decode_table_data(&json!({"totalRows": "x"}), &[]).unwrap_err();
        assert!(matches!(err, TabulaError::MalformedResponse(_)));
        let err = decode_table_data(&json!({"rows": [{"nope": 1}]}), &[]).unwrap_err();
        assert!(matches!(err, TabulaError::MalformedResponse(_)));
    }
}
