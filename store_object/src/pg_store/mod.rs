//! PostgreSQL remote store
//!
//! Rows travel as `jsonb`: selects return `to_jsonb(t)`, writes go through
//! `jsonb_populate_record` so the server applies its own type conversion and
//! defaults. Change notifications arrive over LISTEN/NOTIFY.

mod binding;
mod listener;

use crate::errors::StoreError;
use crate::query_builder::{CountMode, QueryBuilder};
use crate::traits::{RemoteStore, Row, Selection};
use crate::validation::{ValidatedFieldName, ValidatedTableName};
use async_trait::async_trait;
use binding::{bind_value, classify};
use config::RealtimeConfig;
use serde_json::Value;
use signal_system::{ChangeCallback, SignalManager, SubscriptionHandle};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use type_mapping::PostgresValue;

pub struct PgRemoteStore {
    pool: PgPool,
    realtime: RealtimeConfig,
    signals: SignalManager,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PgRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgRemoteStore")
            .field("realtime", &self.realtime)
            .field("signals", &self.signals)
            .finish()
    }
}

fn into_row(table: &str, value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "{} returned a non-object row: {}",
            table, other
        ))),
    }
}

/// Validated column names of a row
fn column_list(row: &Row) -> Result<Vec<String>, StoreError> {
    row.keys()
        .map(|column| Ok(ValidatedFieldName::new(column)?.into_string()))
        .collect()
}

impl PgRemoteStore {
    pub fn new(pool: PgPool, realtime: RealtimeConfig) -> Self {
        let signals = SignalManager::with_max_subscriptions(realtime.max_subscriptions);
        Self {
            pool,
            realtime,
            signals,
            listener: Mutex::new(None),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn signals(&self) -> &SignalManager {
        &self.signals
    }

    /// Start the LISTEN task unless it is already running. The first
    /// connection is made here so that setup errors reach the caller.
    async fn ensure_listener(&self) -> Result<(), StoreError> {
        let mut running = self.listener.lock().await;
        if running.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let channel = self.realtime.channel.clone();
        let mut pg_listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| StoreError::Subscription(format!("listener connection failed: {}", e)))?;
        pg_listener
            .listen(&channel)
            .await
            .map_err(|e| StoreError::Subscription(format!("LISTEN {} failed: {}", channel, e)))?;

        tracing::debug!(%channel, "change listener started");
        *running = Some(tokio::spawn(listener::run_listener(
            pg_listener,
            channel,
            self.signals.clone(),
            Duration::from_millis(self.realtime.reconnect_delay_ms),
        )));
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for PgRemoteStore {
    async fn select(&self, query: &QueryBuilder) -> Result<Selection, StoreError> {
        let table = query.table();
        let (select_sql, select_values) = query.build_select()?;
        let count_statement = match query.count_mode() {
            CountMode::Exact => Some(query.build_count()?),
            CountMode::None => None,
        };
        tracing::debug!(table, sql = %select_sql, "select");

        let db_error = |e| StoreError::database_operation(table, "select", e);

        // Rows and count must observe the same snapshot
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let mut rows_query = sqlx::query_scalar::<_, Value>(&select_sql);
        for value in classify(&select_values) {
            rows_query = bind_value!(rows_query, value);
        }
        let values = rows_query.fetch_all(&mut *tx).await.map_err(db_error)?;

        let count = match count_statement {
            Some((count_sql, count_values)) => {
                let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
                for value in classify(&count_values) {
                    count_query = bind_value!(count_query, value);
                }
                let total = count_query.fetch_one(&mut *tx).await.map_err(db_error)?;
                Some(total.max(0) as u64)
            }
            None => None,
        };

        tx.commit().await.map_err(db_error)?;

        let rows = values
            .into_iter()
            .map(|value| into_row(table, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Selection { rows, count })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let table_name = ValidatedTableName::new(table)?;
        let columns = column_list(&row)?;

        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} AS t DEFAULT VALUES RETURNING to_jsonb(t)",
                table_name
            )
        } else {
            let source: Vec<String> = columns.iter().map(|c| format!("p.{}", c)).collect();
            format!(
                "INSERT INTO {table} AS t ({columns}) SELECT {source} \
                 FROM jsonb_populate_record(NULL::{table}, $1) AS p RETURNING to_jsonb(t)",
                table = table_name,
                columns = columns.join(", "),
                source = source.join(", ")
            )
        };
        tracing::debug!(table, sql = %sql, "insert");

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        if !columns.is_empty() {
            statement = statement.bind(sqlx::types::Json(Value::Object(row)));
        }
        let stored = statement
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(table, "insert", e))?;
        into_row(table, stored)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError> {
        let table_name = ValidatedTableName::new(table)?;
        let columns = column_list(&patch)?;

        let sql = if columns.is_empty() {
            format!(
                "SELECT to_jsonb(t) FROM {} AS t WHERE t.id::text = $1",
                table_name
            )
        } else {
            let assignments: Vec<String> =
                columns.iter().map(|c| format!("{} = p.{}", c, c)).collect();
            format!(
                "UPDATE {table} AS t SET {assignments} \
                 FROM jsonb_populate_record(NULL::{table}, $1) AS p \
                 WHERE t.id::text = $2 RETURNING to_jsonb(t)",
                table = table_name,
                assignments = assignments.join(", ")
            )
        };
        tracing::debug!(table, id, sql = %sql, "update");

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        if !columns.is_empty() {
            statement = statement.bind(sqlx::types::Json(Value::Object(patch)));
        }
        statement = statement.bind(id.to_string());

        let updated = statement
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(table, "update", e))?
            .ok_or_else(|| StoreError::NotFound(format!("{} row with id {}", table, id)))?;
        into_row(table, updated)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let table_name = ValidatedTableName::new(table)?;
        let sql = format!("DELETE FROM {} AS t WHERE t.id::text = $1", table_name);

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation(table, "delete", e))?;
        tracing::debug!(table, id, rows = result.rows_affected(), "delete");
        Ok(())
    }

    async fn subscribe(
        &self,
        table: &str,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError> {
        if !self.realtime.enabled {
            return Err(StoreError::Subscription("realtime is disabled".to_string()));
        }
        ValidatedTableName::new(table)?;
        self.ensure_listener().await?;
        Ok(self.signals.subscribe_callback(table, callback)?)
    }

    async fn call(
        &self,
        procedure: &str,
        args: &[(String, PostgresValue)],
    ) -> Result<Value, StoreError> {
        let name = ValidatedFieldName::new(procedure)?;

        // Null arguments are left to the parameter defaults
        let mut bound = Vec::new();
        let mut named = Vec::new();
        for (arg, value) in args.iter().filter(|(_, value)| !value.is_null()) {
            let arg = ValidatedFieldName::new(arg)?;
            bound.push(value.clone());
            named.push(format!("{} => ${}", arg, bound.len()));
        }
        let sql = format!("SELECT to_jsonb({}({}))", name, named.join(", "));
        tracing::debug!(procedure, sql = %sql, "call");

        let mut statement = sqlx::query_scalar::<_, Value>(&sql);
        for value in bound {
            statement = bind_value!(statement, value);
        }
        statement
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::procedure_call(procedure, e))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::database_operation("", "health_check", e))?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(task) = self.listener.lock().await.take() {
            task.abort();
        }
        self.signals.clear();
        self.pool.close().await;
        tracing::debug!("remote store closed");
    }
}
