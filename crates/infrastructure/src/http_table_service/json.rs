use std::collections::BTreeMap;

use flock_application::{Row, Table};
use flock_core::{AppError, AppResult};
use flock_domain::FieldValue;
use serde_json::{Map, Number, Value};

/// Decodes a list response: a bare array or `{"rows": [...]}`.
pub(super) fn rows_from_json(table: Table, body: Value) -> AppResult<Vec<Row>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("rows") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::Internal(format!(
                    "{table} list response has no 'rows' array"
                )));
            }
        },
        _ => {
            return Err(AppError::Internal(format!(
                "{table} list response must be an array"
            )));
        }
    };

    items
        .into_iter()
        .map(|item| row_from_json(table, item))
        .collect()
}

/// Decodes one row object.
pub(super) fn row_from_json(table: Table, body: Value) -> AppResult<Row> {
    let Value::Object(object) = body else {
        return Err(AppError::Internal(format!(
            "{table} row response must be an object"
        )));
    };

    let cells: BTreeMap<String, FieldValue> = object
        .into_iter()
        .filter_map(|(column, value)| cell_from_json(value).map(|cell| (column, cell)))
        .collect();
    Ok(Row::from_cells(cells))
}

/// Encodes a row as a JSON object.
pub(super) fn row_to_json(row: &Row) -> Value {
    let object: Map<String, Value> = row
        .cells()
        .iter()
        .map(|(column, value)| (column.clone(), cell_to_json(value)))
        .collect();
    Value::Object(object)
}

fn cell_from_json(value: Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(FieldValue::Bool(flag)),
        Value::Number(number) => number.as_f64().map(FieldValue::Number),
        Value::String(text) => Some(FieldValue::Text(text)),
        Value::Array(items) => Some(FieldValue::List(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Null => None,
                    Value::String(text) => Some(text),
                    other => Some(other.to_string()),
                })
                .collect(),
        )),
        object @ Value::Object(_) => Some(FieldValue::Text(object.to_string())),
    }
}

fn cell_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(text) => Value::String(text.clone()),
        FieldValue::Number(number) => Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Date(_) => Value::String(value.as_text()),
        FieldValue::Bool(flag) => Value::Bool(*flag),
        FieldValue::List(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
    }
}
