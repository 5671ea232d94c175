//! Two-phase-commit record matching.
//!
//! A prepare record and its later commit or rollback outcome are linked by
//! the transaction start timestamp. Because the pair may land in different
//! files read by concurrent workers, either side can be observed first:
//! the matcher holds whichever side arrives early and resolves the pair as
//! soon as the other side shows up, independent of observation order.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::bail;
use crate::error::{ErrorKind, PitrResult};
use crate::types::{CommittedChange, RawRecord, RecordKind, Tso};

/// Outcome of a transaction observed before its prepare.
#[derive(Debug)]
enum PendingOutcome {
    Committed { commit_ts: Tso },
    RolledBack,
}

/// Counters produced when the matcher is drained at end of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Commit records whose prepare never appeared in the scanned range.
    pub orphan_commits: u64,
    /// Prepare records that never saw a commit or rollback.
    pub unresolved_prepares: u64,
}

/// Stateful matcher of prepare/commit/rollback record pairs.
///
/// Scoped to one run. One matcher instance is shared by all map workers of
/// a run, since a transaction's prepare and outcome may land in any file.
/// An outcome without a known prepare is held rather than counted: only
/// once the whole input is exhausted can it be classified as an orphan.
#[derive(Debug, Default)]
pub struct Matcher {
    pending_prepares: HashMap<Tso, RawRecord>,
    pending_outcomes: HashMap<Tso, PendingOutcome>,
}

impl Matcher {
    /// Creates an empty matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes one raw record and returns the committed change it resolves,
    /// if any.
    ///
    /// A second prepare for a start timestamp that is still pending is a
    /// protocol violation and fails the run.
    pub fn observe(&mut self, record: RawRecord) -> PitrResult<Option<CommittedChange>> {
        match record.kind {
            RecordKind::Prepare => {
                if self.pending_prepares.contains_key(&record.start_ts) {
                    bail!(
                        ErrorKind::ProtocolViolation,
                        "duplicate prepare record",
                        format!(
                            "start_ts {} already pending, second prepare at {}:{}",
                            record.start_ts, record.source_file, record.source_offset
                        )
                    );
                }

                // The outcome may already have been seen by another worker.
                match self.pending_outcomes.remove(&record.start_ts) {
                    Some(PendingOutcome::Committed { commit_ts }) => {
                        Ok(Some(resolve(record, commit_ts)))
                    }
                    Some(PendingOutcome::RolledBack) => Ok(None),
                    None => {
                        self.pending_prepares.insert(record.start_ts, record);
                        Ok(None)
                    }
                }
            }
            RecordKind::Commit => match self.pending_prepares.remove(&record.start_ts) {
                Some(prepare) => Ok(Some(resolve(prepare, record.commit_ts))),
                None => {
                    self.pending_outcomes.insert(
                        record.start_ts,
                        PendingOutcome::Committed {
                            commit_ts: record.commit_ts,
                        },
                    );
                    Ok(None)
                }
            },
            RecordKind::Rollback => {
                if self.pending_prepares.remove(&record.start_ts).is_none() {
                    self.pending_outcomes
                        .insert(record.start_ts, PendingOutcome::RolledBack);
                }
                Ok(None)
            }
            RecordKind::Ddl => {
                bail!(
                    ErrorKind::InvalidState,
                    "ddl record routed to the 2pc matcher",
                    format!("{}:{}", record.source_file, record.source_offset)
                );
            }
        }
    }

    /// Consumes the matcher at end of input and classifies what is left.
    ///
    /// Held commits without a prepare are orphans: recovery windows
    /// legitimately begin mid-transaction-log. Unresolved prepares are
    /// transactions that never completed within the log horizon. Both are
    /// reported, not treated as fatal.
    pub fn finish(self) -> MatchOutcome {
        let orphan_commits = self
            .pending_outcomes
            .values()
            .filter(|outcome| matches!(outcome, PendingOutcome::Committed { .. }))
            .count() as u64;
        if orphan_commits > 0 {
            warn!(
                orphan_commits,
                "commits without a prepare in the scanned range, skipped"
            );
        }

        let unresolved_prepares = self.pending_prepares.len() as u64;
        if unresolved_prepares > 0 {
            warn!(unresolved_prepares, "prepares left unresolved at end of input");
            for (start_ts, record) in &self.pending_prepares {
                debug!(
                    start_ts,
                    source = %record.source_file,
                    offset = record.source_offset,
                    "unresolved prepare"
                );
            }
        }

        MatchOutcome {
            orphan_commits,
            unresolved_prepares,
        }
    }
}

fn resolve(prepare: RawRecord, commit_ts: Tso) -> CommittedChange {
    CommittedChange {
        commit_ts,
        start_ts: prepare.start_ts,
        database: prepare.database,
        table: prepare.table,
        payload: prepare.payload,
    }
}
