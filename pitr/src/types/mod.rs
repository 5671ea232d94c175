//! Core data types of the merge engine.

mod record;
mod summary;
mod window;

pub use record::{CommittedChange, RawRecord, RecordKind, SchemaEvent, Tso};
pub use summary::RunSummary;
pub use window::TimeWindow;

/// Identifier of a pipeline run.
pub type PipelineId = u64;
