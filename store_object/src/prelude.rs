//! Convenience re-exports for common store-object usage

// Core trait and row types
pub use crate::traits::{ProcedureArgs, RemoteStore, Row, Selection};

// Error types
pub use crate::errors::StoreError;

// Store implementations
pub use crate::memory_store::{MemoryRemoteStore, MemoryTables};
pub use crate::pg_store::PgRemoteStore;

// Schemas
pub use crate::schema::{ColumnDef, OnDelete, TableSchema};

// Validation
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Query building
pub use crate::query_builder::{CountMode, Embed, QueryBuilder, QueryFilter, SortOrder};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde_json::{json, Value};
pub use type_mapping::{ColumnType, PostgresValue};
