use crate::errors::SignalError;
use crate::event::ChangeEvent;
use crate::types::ChangeCallback;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Identifier of one registered subscription
pub type SubscriptionId = u64;

#[derive(Default)]
struct Registry {
    listeners: HashMap<String, Vec<(SubscriptionId, ChangeCallback)>>,
    open: usize,
}

struct Inner {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    max_subscriptions: usize,
}

impl Inner {
    fn remove(&self, table: &str, id: SubscriptionId) -> bool {
        let Ok(mut registry) = self.registry.write() else {
            return false;
        };
        let removed = match registry.listeners.get_mut(table) {
            Some(listeners) => {
                let before = listeners.len();
                listeners.retain(|(lid, _)| *lid != id);
                let removed = listeners.len() < before;
                if listeners.is_empty() {
                    registry.listeners.remove(table);
                }
                removed
            }
            None => false,
        };
        if removed {
            registry.open -= 1;
        }
        removed
    }
}

/// Per-table change notification fan-out.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct SignalManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SignalManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalManager")
            .field("subscription_count", &self.subscription_count())
            .field("max_subscriptions", &self.inner.max_subscriptions)
            .finish()
    }
}

impl SignalManager {
    pub fn new() -> Self {
        Self::with_max_subscriptions(usize::MAX)
    }

    pub fn with_max_subscriptions(max_subscriptions: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                max_subscriptions,
            }),
        }
    }

    /// Register `callback` for every change to `table`
    pub fn subscribe<F>(&self, table: &str, callback: F) -> Result<SubscriptionHandle, SignalError>
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribe_callback(table, Arc::new(callback))
    }

    /// Register an already shared callback for every change to `table`
    pub fn subscribe_callback(
        &self,
        table: &str,
        callback: ChangeCallback,
    ) -> Result<SubscriptionHandle, SignalError> {
        if table.is_empty() {
            return Err(SignalError::EmptyTable);
        }

        let mut registry = self
            .inner
            .registry
            .write()
            .map_err(|_| SignalError::LockPoisoned)?;
        if registry.open >= self.inner.max_subscriptions {
            return Err(SignalError::TooManySubscriptions(registry.open));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        registry
            .listeners
            .entry(table.to_string())
            .or_default()
            .push((id, callback));
        registry.open += 1;

        tracing::trace!(table, id, "subscription opened");

        Ok(SubscriptionHandle {
            id,
            table: table.to_string(),
            registry: Arc::downgrade(&self.inner),
            closed: AtomicBool::new(false),
        })
    }

    /// Deliver `event` to every subscriber of its table.
    ///
    /// Callbacks are snapshotted before delivery, so a subscription closed
    /// during delivery still receives the current event.
    pub fn emit(&self, event: &ChangeEvent) -> usize {
        let snapshot: Vec<ChangeCallback> = match self.inner.registry.read() {
            Ok(registry) => registry
                .listeners
                .get(&event.table)
                .map(|listeners| listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default(),
            Err(_) => return 0,
        };

        for callback in &snapshot {
            callback(event);
        }
        snapshot.len()
    }

    /// Remove a subscription by id. Returns false when it was already gone.
    pub fn unsubscribe(&self, table: &str, id: SubscriptionId) -> bool {
        self.inner.remove(table, id)
    }

    /// Remove every subscription
    pub fn clear(&self) {
        if let Ok(mut registry) = self.inner.registry.write() {
            registry.listeners.clear();
            registry.open = 0;
        }
    }

    /// Number of open subscriptions across all tables
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.read().map(|r| r.open).unwrap_or(0)
    }

    /// Number of open subscriptions for one table
    pub fn listener_count(&self, table: &str) -> usize {
        self.inner
            .registry
            .read()
            .map(|r| r.listeners.get(table).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned subscription. Closing is idempotent and also happens on drop.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    table: String,
    registry: Weak<Inner>,
    closed: AtomicBool,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("table", &self.table)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop delivery to this subscription
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.registry.upgrade() {
            inner.remove(&self.table, self.id);
        }
        tracing::trace!(table = %self.table, id = self.id, "subscription closed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}
