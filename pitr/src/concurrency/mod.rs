//! Coordination primitives shared by the pipeline stages.

pub mod shutdown;
