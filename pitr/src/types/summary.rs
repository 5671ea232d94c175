use serde::Serialize;

/// Counters reported after a successful run.
///
/// Non-fatal conditions observed during the merge are counted here and
/// logged, never silently absorbed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Committed changes delivered to the sink.
    pub emitted_changes: u64,
    /// Changes suppressed by the table filter.
    pub filtered_changes: u64,
    /// Commit records whose prepare was outside the scanned range.
    pub orphan_commits: u64,
    /// Prepare records still unresolved when the input was exhausted.
    pub unresolved_prepares: u64,
    /// Temporary segment files produced by the map phase.
    pub segments_spilled: u64,
    /// Schema changes replayed inside the window.
    pub ddls_applied: u64,
}
