//! Store Object - remote store abstraction for the storefront
//!
//! This crate describes queries (`QueryBuilder`), renders them to SQL,
//! validates identifiers, models table schemas and defines the `RemoteStore`
//! trait with a PostgreSQL and an in-memory implementation.

pub mod errors;
pub mod memory_store;
pub mod pg_store;
pub mod prelude;
pub mod query_builder;
pub mod schema;
pub mod traits;
pub mod validation;

pub use errors::StoreError;
pub use memory_store::{MemoryProcedure, MemoryRemoteStore, MemoryTables};
pub use pg_store::PgRemoteStore;
pub use query_builder::{CountMode, Embed, QueryBuilder, QueryFilter, QueryOperator, SortOrder};
pub use schema::{ColumnDef, ColumnDefault, ForeignKey, OnDelete, TableSchema};
pub use traits::{ProcedureArgs, RemoteStore, Row, Selection};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
