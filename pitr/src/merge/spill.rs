use std::path::PathBuf;

use tracing::debug;

use crate::error::PitrResult;
use crate::merge::SegmentWriter;
use crate::types::CommittedChange;

/// Buffers committed changes and spills sorted segments under a memory
/// budget.
///
/// Changes arrive in file order, not commit order. The spiller accumulates
/// them until either the byte budget or the record cap is reached, sorts the
/// buffer by `(commit_ts, start_ts)` and writes it out as one segment file.
/// Whatever remains at the end stays resident, so small runs never touch
/// disk.
#[derive(Debug)]
pub struct Spiller {
    dir: PathBuf,
    memory_bytes: usize,
    max_records: usize,
    buffer: Vec<CommittedChange>,
    buffered_bytes: usize,
    segments: Vec<PathBuf>,
    next_seq: u64,
}

/// Sorted output of the map phase.
#[derive(Debug)]
pub struct SpillOutput {
    /// Paths of the spilled segment files, each internally sorted.
    pub segments: Vec<PathBuf>,
    /// Changes that never spilled, sorted.
    pub resident: Vec<CommittedChange>,
}

impl SpillOutput {
    /// Number of segment files spilled to disk.
    pub fn segments_spilled(&self) -> u64 {
        self.segments.len() as u64
    }
}

impl Spiller {
    /// Creates a spiller writing segments under `dir`, which must already
    /// exist.
    pub fn new(dir: PathBuf, memory_bytes: usize, max_records: usize) -> Self {
        Self {
            dir,
            memory_bytes,
            max_records,
            buffer: Vec::new(),
            buffered_bytes: 0,
            segments: Vec::new(),
            next_seq: 0,
        }
    }

    /// Buffers one change, spilling a segment when the budget is exceeded.
    pub async fn push(&mut self, change: CommittedChange) -> PitrResult<()> {
        self.buffered_bytes += change.heap_size();
        self.buffer.push(change);

        if self.buffer.len() >= self.max_records || self.buffered_bytes >= self.memory_bytes {
            self.spill().await?;
        }

        Ok(())
    }

    /// Finalizes the map output: remaining changes stay resident, sorted.
    pub fn finish(mut self) -> SpillOutput {
        self.buffer.sort_unstable_by_key(|change| change.sort_key());

        SpillOutput {
            segments: self.segments,
            resident: self.buffer,
        }
    }

    async fn spill(&mut self) -> PitrResult<()> {
        self.buffer.sort_unstable_by_key(|change| change.sort_key());

        let path = self.dir.join(format!("segment-{:06}.json", self.next_seq));
        self.next_seq += 1;

        let mut writer = SegmentWriter::create(&path).await?;
        for change in self.buffer.drain(..) {
            writer.write(&change).await?;
        }
        let path = writer.finish().await?;

        debug!(segment = %path.display(), bytes = self.buffered_bytes, "spilled sorted segment");
        self.buffered_bytes = 0;
        self.segments.push(path);

        Ok(())
    }
}
