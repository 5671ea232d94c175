use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The recovery window ends before it starts.
    #[error("`stop_tso` ({stop_tso}) must be 0 (unbounded) or >= `start_tso` ({start_tso})")]
    WindowEndsBeforeStart {
        /// Configured window start.
        start_tso: u64,
        /// Configured window stop.
        stop_tso: u64,
    },
    /// Spill thresholds cannot be zero.
    #[error("`spill.{0}` cannot be zero")]
    SpillThresholdZero(&'static str),
    /// Batch size cannot be zero.
    #[error("`batch.max_size` cannot be zero")]
    BatchMaxSizeZero,
    /// A table reference in the filter lists is not of the form `db.table`.
    #[error("invalid table reference `{0}`: expected `db.table`")]
    InvalidTableReference(String),
}
