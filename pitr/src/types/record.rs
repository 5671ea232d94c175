use serde::{Deserialize, Serialize};

/// A global, monotonically increasing commit timestamp (TSO).
pub type Tso = u64;

/// Kind of a physical binlog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// First phase of a two-phase commit: carries the row-change payload.
    Prepare,
    /// Second phase outcome: the transaction committed at `commit_ts`.
    Commit,
    /// Second phase outcome: the transaction was rolled back.
    Rollback,
    /// A schema change, finished at `commit_ts`.
    Ddl,
}

/// One physical binlog entry, immutable once decoded.
///
/// Prepare records carry the table identity and the opaque row-change
/// payload; commit and rollback records carry only timestamps and are linked
/// to their prepare by `start_ts`. DDL records carry the statement text in
/// `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Kind of this record.
    pub kind: RecordKind,
    /// Transaction start timestamp, the 2PC pairing key.
    pub start_ts: Tso,
    /// Commit timestamp. Present only on commit and ddl records; 0 otherwise.
    #[serde(default)]
    pub commit_ts: Tso,
    /// Database the change applies to. Empty on commit/rollback records.
    #[serde(default)]
    pub database: String,
    /// Table the change applies to. Empty on commit/rollback and ddl records.
    #[serde(default)]
    pub table: String,
    /// Opaque row-change payload or DDL statement text.
    #[serde(default)]
    pub payload: String,
    /// Path of the file this record was decoded from. Assigned by the
    /// decoder, never persisted.
    #[serde(skip)]
    pub source_file: String,
    /// Byte offset of this record within its source file. Assigned by the
    /// decoder, never persisted.
    #[serde(skip)]
    pub source_offset: u64,
}

/// A resolved, committed row change.
///
/// Produced by matching a prepare record with its commit record. The
/// `commit_ts` is assigned exactly once, by the commit record, and is never
/// recomputed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedChange {
    /// Commit timestamp of the transaction, taken from the commit record.
    pub commit_ts: Tso,
    /// Start timestamp of the transaction, taken from the prepare record.
    pub start_ts: Tso,
    /// Database the change applies to.
    pub database: String,
    /// Table the change applies to.
    pub table: String,
    /// Opaque row-change payload from the prepare record.
    pub payload: String,
}

impl CommittedChange {
    /// Ordering key of the merged stream: commit timestamp with start
    /// timestamp as the deterministic tie-breaker.
    pub fn sort_key(&self) -> (Tso, Tso) {
        (self.commit_ts, self.start_ts)
    }

    /// Approximate resident size in bytes, used for the map memory budget.
    pub fn heap_size(&self) -> usize {
        self.database.len() + self.table.len() + self.payload.len() + 32
    }
}

/// One schema change in the replay history.
///
/// Events are totally ordered by `version`. Base-schema events carry
/// `finished_ts = 0` and are considered applied before the stream starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEvent {
    /// Monotonically increasing schema version. 0 means "assign the next
    /// version when applied" (used for DDL records lifted from binlog files).
    #[serde(default)]
    pub version: i64,
    /// Timestamp at which the schema change finished.
    #[serde(default)]
    pub finished_ts: Tso,
    /// The DDL statement text.
    pub ddl: String,
}
