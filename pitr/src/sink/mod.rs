//! Sinks consuming the final ordered change stream.

mod base;
pub mod json_file;
pub mod memory;

pub use base::Sink;
