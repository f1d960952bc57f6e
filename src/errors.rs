//! Error types for the Storefront crate
//!
//! This module contains all error types that can be returned by Storefront operations.

use config::ConfigError;
use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storefront has been shut down")]
    Closed,

    #[error("{0} requires a PostgreSQL connection")]
    NoDatabase(String),
}

impl StorefrontError {
    /// The underlying store error, if this is one
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            StorefrontError::Store(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_not_found)
    }

    pub fn is_constraint(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_constraint)
    }
}
