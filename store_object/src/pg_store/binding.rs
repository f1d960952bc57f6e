//! Parameter binding
//!
//! Every JSON parameter is classified into a `PostgresValue` and bound with
//! the matching Rust type so PostgreSQL sees a typed parameter.

use type_mapping::PostgresValue;

/// Bind one `PostgresValue` onto a sqlx query of any kind
macro_rules! bind_value {
    ($query:expr, $value:expr) => {
        match $value {
            PostgresValue::Text(v) => $query.bind(v),
            PostgresValue::Integer(v) => $query.bind(v),
            PostgresValue::BigInt(v) => $query.bind(v),
            PostgresValue::Float(v) => $query.bind(v),
            PostgresValue::Boolean(v) => $query.bind(v),
            PostgresValue::Uuid(v) => $query.bind(v),
            PostgresValue::Timestamp(v) => $query.bind(v),
            PostgresValue::Json(v) => $query.bind(sqlx::types::Json(v)),
            PostgresValue::Null => $query.bind(Option::<String>::None),
        }
    };
}

pub(crate) use bind_value;

/// Classify filter parameters for binding
pub(crate) fn classify(values: &[serde_json::Value]) -> Vec<PostgresValue> {
    values.iter().map(PostgresValue::from_json).collect()
}
