//! Callback types for the signal system

use crate::event::ChangeEvent;
use std::sync::Arc;

/// Callback invoked for every change to a subscribed table.
///
/// Callbacks run synchronously on the emitting task and must not block.
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;
