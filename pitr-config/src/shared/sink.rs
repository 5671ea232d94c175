use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for supported recovery sinks.
///
/// Specifies where the merged, ordered change stream is delivered.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkConfig {
    /// In-memory sink for testing and development.
    Memory,
    /// Newline-delimited JSON file sink.
    JsonFile {
        /// Path of the output file. Truncated at the start of a run.
        path: PathBuf,
    },
}
