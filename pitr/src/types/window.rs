use serde::{Deserialize, Serialize};

use crate::types::Tso;

/// Commit-timestamp window of a recovery run.
///
/// `stop_ts == 0` means unbounded. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First commit timestamp accepted.
    pub start_ts: Tso,
    /// Last commit timestamp accepted, or 0 for unbounded.
    pub stop_ts: Tso,
}

impl TimeWindow {
    /// Creates a new window.
    pub fn new(start_ts: Tso, stop_ts: Tso) -> Self {
        Self { start_ts, stop_ts }
    }

    /// Whether a single commit timestamp falls inside the window.
    pub fn contains(&self, commit_ts: Tso) -> bool {
        commit_ts >= self.start_ts && (self.stop_ts == 0 || commit_ts <= self.stop_ts)
    }

    /// Whether a file covering `[min_ts, max_ts]` overlaps the window.
    ///
    /// Files overlapping a boundary are kept in full; filtering happens later
    /// at record granularity because records are not globally pre-sorted
    /// across files.
    pub fn overlaps(&self, min_ts: Tso, max_ts: Tso) -> bool {
        max_ts >= self.start_ts && (self.stop_ts == 0 || min_ts <= self.stop_ts)
    }
}
