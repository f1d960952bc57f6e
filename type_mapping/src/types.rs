//! Type mapping definitions
//!
//! `PostgresValue` is the typed form of a JSON value right before it is bound
//! to a PostgreSQL statement.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostgresValue {
    Text(String),
    Integer(i32),
    BigInt(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(chrono::DateTime<chrono::Utc>),
    Json(Value),
    Null,
}

impl PostgresValue {
    /// Classify a JSON value into the PostgreSQL type it should be bound as.
    ///
    /// Strings that parse as RFC 3339 timestamps or UUIDs are bound with those
    /// types so they compare against `timestamptz`/`uuid` columns without casts.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                    PostgresValue::Timestamp(dt.with_timezone(&chrono::Utc))
                } else if let Ok(uuid) = Uuid::parse_str(s) {
                    PostgresValue::Uuid(uuid)
                } else {
                    PostgresValue::Text(s.clone())
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                        PostgresValue::Integer(i as i32)
                    } else {
                        PostgresValue::BigInt(i)
                    }
                } else if let Some(f) = n.as_f64() {
                    PostgresValue::Float(f)
                } else {
                    PostgresValue::Text(n.to_string())
                }
            }
            Value::Bool(b) => PostgresValue::Boolean(*b),
            Value::Null => PostgresValue::Null,
            other => PostgresValue::Json(other.clone()),
        }
    }

    /// Convert back into JSON, the representation rows are returned in
    pub fn to_json(&self) -> Value {
        match self {
            PostgresValue::Text(s) => Value::String(s.clone()),
            PostgresValue::Integer(i) => Value::from(*i),
            PostgresValue::BigInt(i) => Value::from(*i),
            PostgresValue::Float(f) => Value::from(*f),
            PostgresValue::Boolean(b) => Value::Bool(*b),
            PostgresValue::Uuid(u) => Value::String(u.to_string()),
            PostgresValue::Timestamp(ts) => Value::String(
                ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            ),
            PostgresValue::Json(v) => v.clone(),
            PostgresValue::Null => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PostgresValue::Null)
    }

    /// PostgreSQL type name, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            PostgresValue::Text(_) => "text",
            PostgresValue::Integer(_) => "integer",
            PostgresValue::BigInt(_) => "bigint",
            PostgresValue::Float(_) => "double precision",
            PostgresValue::Boolean(_) => "boolean",
            PostgresValue::Uuid(_) => "uuid",
            PostgresValue::Timestamp(_) => "timestamptz",
            PostgresValue::Json(_) => "jsonb",
            PostgresValue::Null => "null",
        }
    }
}

impl From<String> for PostgresValue {
    fn from(val: String) -> Self {
        PostgresValue::Text(val)
    }
}

impl From<&str> for PostgresValue {
    fn from(val: &str) -> Self {
        PostgresValue::Text(val.to_string())
    }
}

impl From<i32> for PostgresValue {
    fn from(val: i32) -> Self {
        PostgresValue::Integer(val)
    }
}

impl From<i64> for PostgresValue {
    fn from(val: i64) -> Self {
        PostgresValue::BigInt(val)
    }
}

impl From<f64> for PostgresValue {
    fn from(val: f64) -> Self {
        PostgresValue::Float(val)
    }
}

impl From<bool> for PostgresValue {
    fn from(val: bool) -> Self {
        PostgresValue::Boolean(val)
    }
}

impl From<Uuid> for PostgresValue {
    fn from(val: Uuid) -> Self {
        PostgresValue::Uuid(val)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for PostgresValue {
    fn from(val: chrono::DateTime<chrono::Utc>) -> Self {
        PostgresValue::Timestamp(val)
    }
}

impl From<Value> for PostgresValue {
    fn from(val: Value) -> Self {
        PostgresValue::Json(val)
    }
}

impl<T> From<Option<T>> for PostgresValue
where
    T: Into<PostgresValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => PostgresValue::Null,
        }
    }
}
