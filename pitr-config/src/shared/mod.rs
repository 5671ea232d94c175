//! Shared configuration types for PITR recovery runs.

mod base;
mod batch;
mod filter;
mod pipeline;
mod recover;
mod schema;
mod sink;
mod spill;

pub use base::ValidationError;
pub use batch::BatchConfig;
pub use filter::FilterConfig;
pub use pipeline::PipelineConfig;
pub use recover::RecoverConfig;
pub use schema::SchemaSourceConfig;
pub use sink::SinkConfig;
pub use spill::SpillConfig;
