//! # Storefront
//!
//! Catalog data-access layer for an e-commerce storefront on PostgreSQL.
//! Query adapters compose filtered, sorted queries per table, track their
//! result state and re-fetch whenever the table changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storefront::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let storefront = Storefront::connect(&config).await?;
//!     storefront.migrate(false).await?;
//!
//!     // Featured products under 50, newest first, kept fresh by change notifications
//!     let filter = FilterSpec::default().featured(true).price_range(0.0, 50.0);
//!     let products = storefront.products(Some(filter), None, Some(20)).await?;
//!
//!     let result = products.snapshot();
//!     println!("{} of {} products", result.rows.len(), result.total);
//!
//!     // The same API runs without a server
//!     let memory = Arc::new(MemoryRemoteStore::with_schemas(catalog_schemas()));
//!     let offline = Storefront::with_store(memory, RealtimeConfig::default());
//!     let brands = offline.brands(true).await?;
//!     assert!(brands.snapshot().error.is_none());
//!
//!     storefront.shutdown().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod adapter;
pub mod catalog;
pub mod core;
pub mod errors;
pub mod forms;
pub mod migration;
pub mod prelude;
pub mod procedures;
pub mod search;

// Re-export the main public types for convenience
pub use adapter::{FilterSpec, QueryAdapter, QueryOptions, ResultSet, SortSpec};
pub use catalog::{CatalogTable, FilterKey};
pub use core::Storefront;
pub use errors::StorefrontError;

// Re-export centralized config
pub use config::{AppConfig, ConfigError, DatabaseConfig, RealtimeConfig};

// Re-export internal crates used in the public API
pub use signal_system;
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
