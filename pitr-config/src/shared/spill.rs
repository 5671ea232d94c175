use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Memory budget for the map phase of the merge.
///
/// Matched changes accumulate in memory until either threshold is reached, at
/// which point the buffer is sorted and spilled to a temporary segment file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpillConfig {
    /// Maximum bytes of buffered payload before a spill is forced.
    #[serde(default = "default_memory_bytes")]
    pub memory_bytes: usize,
    /// Maximum number of buffered records before a spill is forced.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

impl SpillConfig {
    /// Default in-memory payload budget (512 MiB).
    pub const DEFAULT_MEMORY_BYTES: usize = 512 * 1024 * 1024;

    /// Default record-count budget.
    pub const DEFAULT_MAX_RECORDS: usize = 1_000_000;

    /// Validates spill configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.memory_bytes == 0 {
            return Err(ValidationError::SpillThresholdZero("memory_bytes"));
        }
        if self.max_records == 0 {
            return Err(ValidationError::SpillThresholdZero("max_records"));
        }

        Ok(())
    }
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            memory_bytes: default_memory_bytes(),
            max_records: default_max_records(),
        }
    }
}

fn default_memory_bytes() -> usize {
    SpillConfig::DEFAULT_MEMORY_BYTES
}

fn default_max_records() -> usize {
    SpillConfig::DEFAULT_MAX_RECORDS
}
