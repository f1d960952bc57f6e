//! Generic query/subscription adapter
//!
//! `compose` turns a table name and `QueryOptions` into a `QueryBuilder`;
//! `QueryAdapter` runs it, tracks the `ResultSet` and keeps it fresh from the
//! table's change feed; `presets` names the common configurations.

pub mod compose;
pub mod options;
pub mod presets;
pub mod query_adapter;
pub mod result;

pub use compose::compose;
pub use options::{FilterSpec, QueryOptions, SortSpec};
pub use presets::Preset;
pub use query_adapter::QueryAdapter;
pub use result::ResultSet;
