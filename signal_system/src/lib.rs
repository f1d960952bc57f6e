//! Signal system for table change notifications
//!
//! This crate routes insert/update/delete notifications for a table to the
//! callbacks subscribed to that table, and hands out owned handles that
//! release a subscription exactly once.

pub mod errors;
pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use errors::SignalError;
pub use event::{ChangeEvent, ChangeKind};
pub use manager::{SignalManager, SubscriptionHandle, SubscriptionId};
pub use types::ChangeCallback;
