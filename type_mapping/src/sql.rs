//! SQL column types
//!
//! Column types drive DDL generation and emulate PostgreSQL input conversion
//! for stores that do not run on a real server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Uuid,
    Text,
    Integer,
    BigInt,
    Numeric,
    Boolean,
    Timestamp,
    Json,
    TextArray,
}

impl ColumnType {
    /// PostgreSQL type used in CREATE TABLE
    pub fn to_sql(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "UUID",
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Numeric => "NUMERIC(12,2)",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP WITH TIME ZONE",
            ColumnType::Json => "JSONB",
            ColumnType::TextArray => "TEXT[]",
        }
    }

    /// Convert an input value the way PostgreSQL converts JSON input for this
    /// column type. `Null` always passes; nullability is checked separately.
    pub fn normalize(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(value);
        }
        match self {
            ColumnType::Uuid => match &value {
                Value::String(s) => uuid::Uuid::parse_str(s)
                    .map(|u| Value::String(u.to_string()))
                    .map_err(|_| invalid_input("uuid", &value)),
                _ => Err(invalid_input("uuid", &value)),
            },
            ColumnType::Text => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Ok(Value::String(other.to_string())),
            },
            ColumnType::Integer | ColumnType::BigInt => {
                let parsed = match &value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(i) if *self == ColumnType::BigInt => Ok(Value::from(i)),
                    Some(i) if i >= i32::MIN as i64 && i <= i32::MAX as i64 => Ok(Value::from(i)),
                    _ => Err(invalid_input(self.type_label(), &value)),
                }
            }
            ColumnType::Numeric => {
                let parsed = match &value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match parsed {
                    Some(f) if f.is_finite() => Ok(numeric_value(f)),
                    _ => Err(invalid_input("numeric", &value)),
                }
            }
            ColumnType::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                    "false" | "f" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                    _ => Err(invalid_input("boolean", &value)),
                },
                _ => Err(invalid_input("boolean", &value)),
            },
            ColumnType::Timestamp => match &value {
                Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| {
                        Value::String(
                            dt.with_timezone(&chrono::Utc)
                                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
                        )
                    })
                    .map_err(|_| invalid_input("timestamp with time zone", &value)),
                _ => Err(invalid_input("timestamp with time zone", &value)),
            },
            ColumnType::Json => Ok(value),
            ColumnType::TextArray => match &value {
                Value::Array(items) if items.iter().all(|i| i.is_string() || i.is_null()) => {
                    Ok(value)
                }
                _ => Err(invalid_input("text[]", &value)),
            },
        }
    }

    fn type_label(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "bigint",
            _ => "integer",
        }
    }
}

/// Whole numbers stay integral so equality against integer JSON holds
fn numeric_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

fn invalid_input(type_name: &str, value: &Value) -> String {
    format!("invalid input syntax for type {}: {}", type_name, value)
}
