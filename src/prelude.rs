//! Convenience re-exports for common Storefront usage
//!
//! This prelude module re-exports the most commonly used items from the
//! Storefront workspace, so one `use storefront::prelude::*;` covers a
//! typical caller.

// Core Storefront components
pub use crate::core::Storefront;
pub use crate::errors::StorefrontError;
pub use crate::migration;

// Adapters and their configuration
pub use crate::adapter::{FilterSpec, Preset, QueryAdapter, QueryOptions, ResultSet, SortSpec, presets};
pub use crate::catalog::{CatalogTable, FilterKey, catalog_schemas};

// Search, procedures and forms
pub use crate::forms::{ProductForm, slugify};
pub use crate::procedures::{
    InventoryAdjustment, InventoryChangeType, OrderItemInput, install_memory_procedures,
};
pub use crate::search::{product_details, search_products};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, RealtimeConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Re-export signal system for event handling
pub use signal_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
