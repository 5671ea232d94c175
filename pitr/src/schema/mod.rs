//! Versioned schema state and its replay against the change stream.
//!
//! Schema events originate from a single authoritative history, so they
//! arrive globally ordered by completion timestamp, unlike row data. The
//! replayer interleaves them into the merged change stream so every change
//! is interpreted under the schema version active at its commit timestamp.

mod history;
mod replayer;
mod state;

pub use history::{load_base_schema, load_history_file};
pub use replayer::SchemaReplayer;
pub use state::SchemaState;
