use serde::{Deserialize, Serialize};

use crate::load::Config;
use crate::shared::{FilterConfig, PipelineConfig, SchemaSourceConfig, SinkConfig, ValidationError};

/// Top-level configuration for the `pitr-recover` binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecoverConfig {
    /// Merge pipeline settings.
    pub pipeline: PipelineConfig,
    /// Table allow/deny lists.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Schema history source for replay.
    #[serde(default)]
    pub schema: SchemaSourceConfig,
    /// Destination of the merged change stream.
    pub sink: SinkConfig,
}

impl RecoverConfig {
    /// Validates all nested configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.pipeline.validate()?;
        self.filter.validate()?;

        Ok(())
    }
}

impl Config for RecoverConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[
        "filter.do_dbs",
        "filter.do_tables",
        "filter.ignore_dbs",
        "filter.ignore_tables",
    ];
}
