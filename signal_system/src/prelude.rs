//! Convenience re-exports for common signal-system usage

pub use crate::errors::SignalError;
pub use crate::event::{ChangeEvent, ChangeKind};
pub use crate::manager::{SignalManager, SubscriptionHandle, SubscriptionId};
pub use crate::types::ChangeCallback;
