//! Query description and SQL generation
//!
//! The same `QueryBuilder` drives both the PostgreSQL store, through
//! `SqlGenerator`, and the in-memory store, which evaluates it directly.

pub mod builder;
pub mod filter;
pub mod join;
pub mod ordering;
pub mod sql_generation;

#[cfg(test)]
mod tests;

pub use builder::{CountMode, QueryBuilder};
pub use filter::{escape_like, LogicalOperator, QueryCondition, QueryFilter, QueryOperator};
pub use join::{Embed, EmbedKind};
pub use ordering::SortOrder;
pub use sql_generation::SqlGenerator;
