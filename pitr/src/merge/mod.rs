//! External sort of committed changes.
//!
//! The map phase buffers resolved changes in memory and spills them to
//! sorted segment files when a budget is reached. The reduce phase merges
//! the sorted segments (plus the resident tail that never spilled) into one
//! globally ordered sequence with a k-way heap merge.

mod kway;
mod segment;
mod spill;

pub use kway::{KwayMerge, MergeSource};
pub use segment::{SegmentReader, SegmentWriter};
pub use spill::{SpillOutput, Spiller};
