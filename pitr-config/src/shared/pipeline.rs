use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, SpillConfig, ValidationError};

/// Configuration for a PITR merge pipeline run.
///
/// Contains everything the merge engine needs: the input directory, the
/// commit-timestamp window, memory budgets for the map phase, and temporary
/// segment handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Unique identifier for this pipeline run.
    pub id: u64,
    /// Directory containing the binlog files to merge.
    pub data_dir: PathBuf,
    /// Start of the recovery window as a commit timestamp. 0 means from the
    /// earliest available record.
    #[serde(default)]
    pub start_tso: u64,
    /// End of the recovery window as a commit timestamp. 0 means unbounded.
    #[serde(default)]
    pub stop_tso: u64,
    /// Memory budget for the map phase.
    #[serde(default)]
    pub spill: SpillConfig,
    /// Batch sizing for sink emission.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Optional override for where temporary segments are written. Defaults
    /// to a run-scoped directory under `data_dir`.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Keep the temporary segment directory after the run for diagnostics.
    ///
    /// Defaults to false: the directory is removed on exit from any terminal
    /// state, including failures and cancellation.
    #[serde(default)]
    pub retain_temp_dir: bool,
}

impl PipelineConfig {
    /// Validates pipeline configuration settings.
    ///
    /// Checks window ordering and that the spill and batch budgets are
    /// non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stop_tso != 0 && self.stop_tso < self.start_tso {
            return Err(ValidationError::WindowEndsBeforeStart {
                start_tso: self.start_tso,
                stop_tso: self.stop_tso,
            });
        }

        self.spill.validate()?;
        self.batch.validate()?;

        Ok(())
    }
}
