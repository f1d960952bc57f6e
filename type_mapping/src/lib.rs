//! Unified value mapping between JSON rows and PostgreSQL
//!
//! Rows travel through the storefront as JSON objects. This crate decides how
//! a JSON value is bound as a PostgreSQL parameter, how column types accept
//! input, and how loosely typed form input is coerced.

pub mod coerce;
pub mod sql;
pub mod types;

pub use coerce::{coerce_f64, coerce_i64, coerce_optional_f64, non_blank};
pub use sql::ColumnType;
pub use types::PostgresValue;
