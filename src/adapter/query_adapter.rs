//! Query adapter
//!
//! A `QueryAdapter` owns one table query and its result state. With realtime
//! enabled it also owns one change subscription: every notification for the
//! table queues exactly one re-fetch with the configuration active at that
//! moment.
//!
//! Fetches may overlap. Each one takes a sequence number when it starts and
//! its result becomes visible only if no later fetch has been applied first,
//! so a slow, stale response can never overwrite a newer one.

use super::compose::compose;
use super::options::QueryOptions;
use super::result::ResultSet;
use parking_lot::{Mutex, RwLock};
use signal_system::{ChangeCallback, ChangeEvent, ChangeKind, SubscriptionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store_object::{RemoteStore, Row, StoreError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
struct ActiveQuery {
    table: String,
    options: QueryOptions,
}

struct Shared {
    store: Arc<dyn RemoteStore>,
    active: RwLock<ActiveQuery>,
    state: watch::Sender<ResultSet>,
    next_seq: AtomicU64,
    applied_seq: Mutex<u64>,
}

impl Shared {
    /// Run the active query once. Returns whether the result was applied.
    async fn fetch(&self) -> bool {
        let (seq, active) = {
            let active = self.active.read();
            (self.next_seq.fetch_add(1, Ordering::SeqCst) + 1, active.clone())
        };

        {
            let applied = self.applied_seq.lock();
            if seq > *applied {
                self.state.send_if_modified(|state| !std::mem::replace(&mut state.loading, true));
            }
        }

        let result = match compose(&active.table, &active.options) {
            Ok(query) => match self.store.select(&query).await {
                Ok(selection) => ResultSet::settled(selection),
                Err(e) => {
                    tracing::warn!(table = %active.table, error = %e, "fetch failed");
                    ResultSet::failed(e.to_string())
                }
            },
            Err(e) => ResultSet::failed(e.to_string()),
        };

        self.apply(seq, result)
    }

    fn apply(&self, seq: u64, result: ResultSet) -> bool {
        let mut applied = self.applied_seq.lock();
        if seq <= *applied {
            tracing::trace!(seq, applied = *applied, "discarding stale fetch");
            return false;
        }
        *applied = seq;
        crate::trace_log!(seq, rows = result.rows.len(), total = result.total, "fetch applied");
        self.state.send_replace(result);
        true
    }

    /// Make every fetch started so far stale
    fn fence(&self) {
        let barrier = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        *self.applied_seq.lock() = barrier;
    }
}

struct Subscription {
    handle: SubscriptionHandle,
    worker: JoinHandle<()>,
}

impl Subscription {
    fn close(self) {
        self.handle.close();
        self.worker.abort();
    }
}

pub struct QueryAdapter {
    shared: Arc<Shared>,
    realtime_enabled: bool,
    subscription: Option<Subscription>,
}

impl std::fmt::Debug for QueryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAdapter")
            .field("active", &*self.shared.active.read())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl QueryAdapter {
    /// Create an adapter, run its first fetch and, when both `options.realtime`
    /// and `realtime_enabled` are set, open its change subscription.
    ///
    /// A failed fetch is recorded in the result set. A failed subscription
    /// setup is returned.
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        table: impl Into<String>,
        options: QueryOptions,
        realtime_enabled: bool,
    ) -> Result<Self, StoreError> {
        let (state, _) = watch::channel(ResultSet::pending());
        let shared = Arc::new(Shared {
            store,
            active: RwLock::new(ActiveQuery {
                table: table.into(),
                options,
            }),
            state,
            next_seq: AtomicU64::new(0),
            applied_seq: Mutex::new(0),
        });

        let mut adapter = Self {
            shared,
            realtime_enabled,
            subscription: None,
        };
        adapter.start().await?;
        Ok(adapter)
    }

    async fn start(&mut self) -> Result<(), StoreError> {
        self.shared.fetch().await;
        if self.wants_realtime() {
            self.subscription = Some(self.subscribe().await?);
        }
        Ok(())
    }

    fn wants_realtime(&self) -> bool {
        self.realtime_enabled && self.shared.active.read().options.realtime
    }

    async fn subscribe(&self) -> Result<Subscription, StoreError> {
        let table = self.table();
        let (tx, mut rx) = mpsc::unbounded_channel::<ChangeKind>();
        let callback: ChangeCallback = Arc::new(move |event: &ChangeEvent| {
            let _ = tx.send(event.kind);
        });
        let handle = self.shared.store.subscribe(&table, callback).await?;

        let shared = Arc::downgrade(&self.shared);
        let worker = tokio::spawn(async move {
            while let Some(kind) = rx.recv().await {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                tracing::trace!(kind = kind.as_str(), "change notification");
                shared.fetch().await;
            }
        });

        crate::debug_log!(table = %table, id = handle.id(), "subscribed to changes");
        Ok(Subscription { handle, worker })
    }

    /// Switch to a new table or configuration.
    ///
    /// The old subscription is closed before anything else happens, in-flight
    /// fetches become stale and the result set starts over. Reconfiguring to
    /// the current configuration does nothing.
    pub async fn reconfigure(
        &mut self,
        table: impl Into<String>,
        options: QueryOptions,
    ) -> Result<(), StoreError> {
        let next = ActiveQuery {
            table: table.into(),
            options,
        };
        if *self.shared.active.read() == next {
            return Ok(());
        }

        self.release();
        {
            let mut active = self.shared.active.write();
            crate::debug_log!(from = %active.table, to = %next.table, "reconfiguring adapter");
            *active = next;
            self.shared.fence();
            self.shared.state.send_replace(ResultSet::pending());
        }
        self.start().await
    }

    /// Run the active query again now
    pub async fn refetch(&self) -> ResultSet {
        self.shared.fetch().await;
        self.snapshot()
    }

    /// Release the change subscription. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            crate::debug_log!(table = %subscription.handle.table(), "releasing subscription");
            subscription.close();
        }
    }

    pub fn snapshot(&self) -> ResultSet {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every visible change of the result set
    pub fn watch(&self) -> watch::Receiver<ResultSet> {
        self.shared.state.subscribe()
    }

    pub fn table(&self) -> String {
        self.shared.active.read().table.clone()
    }

    pub fn options(&self) -> QueryOptions {
        self.shared.active.read().options.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|s| !s.handle.is_closed())
    }

    // ========================================
    // Row mutations
    // ========================================

    /// Insert into the adapter's table and return the stored row. The result
    /// set is not touched; realtime delivery or a refetch picks the row up.
    pub async fn insert(&self, row: Row) -> Result<Row, StoreError> {
        let table = self.table();
        self.shared.store.insert(&table, row).await
    }

    /// Fails with `StoreError::NotFound` when no row has `id`
    pub async fn update(&self, id: &str, patch: Row) -> Result<Row, StoreError> {
        let table = self.table();
        self.shared.store.update(&table, id, patch).await
    }

    /// Deleting a missing row succeeds
    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let table = self.table();
        self.shared.store.delete(&table, id).await
    }
}

impl Drop for QueryAdapter {
    fn drop(&mut self) {
        self.release();
    }
}
