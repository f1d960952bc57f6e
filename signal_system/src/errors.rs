//! Error types for the signal system

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    #[error("Subscription limit reached ({0} open subscriptions)")]
    TooManySubscriptions(usize),

    #[error("Table name cannot be empty")]
    EmptyTable,

    #[error("Signal registry lock poisoned")]
    LockPoisoned,
}
