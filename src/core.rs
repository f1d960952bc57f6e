//! Core Storefront functionality
//!
//! `Storefront` is the explicitly constructed client handle: it owns the
//! remote store, hands out query adapters and runs searches, procedures and
//! migrations against it until it is shut down.

use crate::adapter::{FilterSpec, Preset, QueryAdapter, QueryOptions, SortSpec, presets};
use crate::errors::StorefrontError;
use crate::procedures::{self, InventoryAdjustment, OrderItemInput};
use crate::search;
use config::{AppConfig, RealtimeConfig};
use sqlx::PgPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use store_object::{PgRemoteStore, RemoteStore, Row};

pub struct Storefront {
    store: Arc<dyn RemoteStore>,
    pool: Option<PgPool>,
    realtime: RealtimeConfig,
    closed: AtomicBool,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("store", &self.store)
            .field("realtime", &self.realtime)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Storefront {
    /// Connect to PostgreSQL and listen for table changes on the configured channel
    pub async fn connect(config: &AppConfig) -> Result<Self, StorefrontError> {
        config.validate()?;
        let database = &config.database;

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&database.connection_string()).await?;
        tracing::info!(
            max_connections = database.max_connections,
            realtime = config.realtime.enabled,
            "connected to database"
        );

        let store = PgRemoteStore::new(pool.clone(), config.realtime.clone());
        Ok(Self {
            store: Arc::new(store),
            pool: Some(pool),
            realtime: config.realtime.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Use an already constructed store
    pub fn with_store(store: Arc<dyn RemoteStore>, realtime: RealtimeConfig) -> Self {
        Self {
            store,
            pool: None,
            realtime,
            closed: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.store)
    }

    /// Database pool, when connected to PostgreSQL
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn realtime(&self) -> &RealtimeConfig {
        &self.realtime
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn check_open(&self) -> Result<(), StorefrontError> {
        if self.is_closed() {
            return Err(StorefrontError::Closed);
        }
        Ok(())
    }

    // ========================================
    // Adapters
    // ========================================

    /// Open a query adapter on `table`. Realtime is honoured only when it is
    /// enabled in the configuration.
    pub async fn adapter(
        &self,
        table: &str,
        options: QueryOptions,
    ) -> Result<QueryAdapter, StorefrontError> {
        self.check_open()?;
        let adapter =
            QueryAdapter::open(self.store(), table, options, self.realtime.enabled).await?;
        Ok(adapter)
    }

    pub async fn preset(&self, preset: Preset) -> Result<QueryAdapter, StorefrontError> {
        self.adapter(preset.table.name(), preset.options).await
    }

    pub async fn products(
        &self,
        filter: Option<FilterSpec>,
        sort: Option<SortSpec>,
        limit: Option<u32>,
    ) -> Result<QueryAdapter, StorefrontError> {
        self.preset(presets::products(filter, sort, limit)).await
    }

    pub async fn categories(&self, active_only: bool) -> Result<QueryAdapter, StorefrontError> {
        self.preset(presets::categories(active_only)).await
    }

    pub async fn brands(&self, active_only: bool) -> Result<QueryAdapter, StorefrontError> {
        self.preset(presets::brands(active_only)).await
    }

    pub async fn gender_categories(
        &self,
        active_only: bool,
    ) -> Result<QueryAdapter, StorefrontError> {
        self.preset(presets::gender_categories(active_only)).await
    }

    pub async fn orders(&self, customer_id: Option<&str>) -> Result<QueryAdapter, StorefrontError> {
        self.preset(presets::orders(customer_id)).await
    }

    // ========================================
    // Single-shot reads and procedures
    // ========================================

    pub async fn search_products(
        &self,
        term: &str,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<Row>, StorefrontError> {
        self.check_open()?;
        Ok(search::search_products(self.store.as_ref(), term, filter).await?)
    }

    pub async fn product_details(&self, product_id: &str) -> Result<Row, StorefrontError> {
        self.check_open()?;
        Ok(search::product_details(self.store.as_ref(), product_id).await?)
    }

    pub async fn create_order(
        &self,
        order: Row,
        items: &[OrderItemInput],
    ) -> Result<Row, StorefrontError> {
        self.check_open()?;
        Ok(procedures::create_order(self.store.as_ref(), order, items).await?)
    }

    pub async fn adjust_inventory(
        &self,
        adjustment: &InventoryAdjustment,
    ) -> Result<Row, StorefrontError> {
        self.check_open()?;
        Ok(procedures::adjust_inventory(self.store.as_ref(), adjustment).await?)
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), StorefrontError> {
        self.check_open()?;
        self.store.health_check().await?;
        Ok(())
    }

    /// Stop change delivery and release connections. Later calls fail with
    /// `StorefrontError::Closed`; calling this again does nothing.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.store.close().await;
        tracing::info!("storefront shut down");
    }
}
