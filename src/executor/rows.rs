//! Row Conversion
//!
//! Converts `tokio_postgres` rows into ordered column-name -> JSON value
//! maps for the host/agent surface.
//!
//! # Type Mapping
//! - Integers and booleans map to native JSON values
//! - Floats map to JSON numbers (NaN/Infinity become null)
//! - JSON/JSONB columns are preserved as nested JSON
//! - BYTEA is Base64-encoded for JSON safety
//! - Timestamps, dates and UUIDs become ISO-style strings
//! - Anything else falls back to its text representation

use serde_json::Value;
use tokio_postgres::Row;

use crate::error::{RailError, Result};

/// Convert a row to an ordered column-name -> value mapping
pub fn row_to_map(row: &Row) -> Result<serde_json::Map<String, Value>> {
    let mut map = serde_json::Map::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), value_to_json(row, idx)?);
    }

    Ok(map)
}

/// Convert a single column value to JSON
fn value_to_json(row: &Row, idx: usize) -> Result<Value> {
    use tokio_postgres::types::Type;

    let col_type = row.columns()[idx].type_();

    let get_err = |e: tokio_postgres::Error| {
        RailError::query_failed(format!(
            "Failed to convert PostgreSQL type '{}' to JSON: {e}",
            col_type.name()
        ))
    };

    let value = match *col_type {
        Type::BOOL => {
            let v: Option<bool> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, Value::Bool)
        }

        Type::INT2 => {
            let v: Option<i16> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::Number(v.into()))
        }
        Type::INT4 => {
            let v: Option<i32> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::Number(v.into()))
        }
        Type::INT8 => {
            let v: Option<i64> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::Number(v.into()))
        }

        Type::FLOAT4 => {
            let v: Option<f32> = row.try_get(idx).map_err(get_err)?;
            // NaN/Infinity have no JSON representation
            v.and_then(|v| serde_json::Number::from_f64(f64::from(v)))
                .map_or(Value::Null, Value::Number)
        }
        Type::FLOAT8 => {
            let v: Option<f64> = row.try_get(idx).map_err(get_err)?;
            v.and_then(serde_json::Number::from_f64).map_or(Value::Null, Value::Number)
        }

        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => {
            let v: Option<String> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, Value::String)
        }

        Type::JSON | Type::JSONB => {
            let v: Option<Value> = row.try_get(idx).map_err(get_err)?;
            v.unwrap_or(Value::Null)
        }

        Type::BYTEA => {
            let v: Option<Vec<u8>> = row.try_get(idx).map_err(get_err)?;
            match v {
                Some(bytes) => {
                    use base64::Engine;
                    Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
                }
                None => Value::Null,
            }
        }

        Type::TIMESTAMP => {
            let v: Option<chrono::NaiveDateTime> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
        }
        Type::TIMESTAMPTZ => {
            let v: Option<chrono::DateTime<chrono::Utc>> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::String(v.to_rfc3339()))
        }
        Type::DATE => {
            let v: Option<chrono::NaiveDate> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::String(v.format("%Y-%m-%d").to_string()))
        }

        Type::UUID => {
            let v: Option<uuid::Uuid> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, |v| Value::String(v.to_string()))
        }

        // Everything else (numeric, vector, arrays, enums, ...) falls back
        // to the text representation the server sends
        _ => {
            let v: Option<String> = row.try_get(idx).map_err(get_err)?;
            v.map_or(Value::Null, Value::String)
        }
    };

    Ok(value)
}
