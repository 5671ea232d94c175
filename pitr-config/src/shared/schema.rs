use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the schema history used for replay comes from.
///
/// The engine treats whichever source is configured as authoritative and
/// pre-sorted by schema version.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSourceConfig {
    /// No schema replay: row changes are emitted without schema
    /// interpretation.
    #[default]
    None,
    /// A fixed base-schema file with one DDL statement per line. All
    /// statements are considered pre-applied before the window starts.
    BaseFile {
        /// Path to the base schema file.
        path: PathBuf,
    },
    /// A schema history file of versioned DDL events. Events finishing before
    /// the window start form the base schema; later events are replayed
    /// inside the stream.
    HistoryFile {
        /// Path to the newline-delimited JSON history file.
        path: PathBuf,
    },
}
