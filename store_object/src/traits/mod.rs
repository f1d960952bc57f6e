//! Traits for remote store operations
//!
//! This module contains the trait every remote tabular store implements.

pub mod remote_store;

pub use remote_store::{ProcedureArgs, RemoteStore, Row, Selection};
