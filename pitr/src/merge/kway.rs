use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::Path;
use std::vec;

use crate::error::PitrResult;
use crate::merge::SegmentReader;
use crate::types::CommittedChange;

/// One input of the k-way merge: a spilled segment file or the resident
/// tail of the map buffer.
#[derive(Debug)]
pub enum MergeSource {
    Segment(SegmentReader),
    Resident(vec::IntoIter<CommittedChange>),
}

impl MergeSource {
    /// Opens a spilled segment as a merge input.
    pub async fn open_segment(path: &Path) -> PitrResult<Self> {
        Ok(Self::Segment(SegmentReader::open(path).await?))
    }

    /// Wraps an already sorted in-memory run as a merge input.
    pub fn resident(changes: Vec<CommittedChange>) -> Self {
        Self::Resident(changes.into_iter())
    }

    async fn next_change(&mut self) -> PitrResult<Option<CommittedChange>> {
        match self {
            Self::Segment(reader) => reader.next_change().await,
            Self::Resident(iter) => Ok(iter.next()),
        }
    }
}

/// Head of one source inside the heap.
///
/// Ordered by `(commit_ts, start_ts)` with the source index as final
/// tie-breaker, so changes with equal keys come out in source order and the
/// merge output is deterministic.
#[derive(Debug)]
struct HeadEntry {
    change: CommittedChange,
    source: usize,
}

impl PartialEq for HeadEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeadEntry {}

impl PartialOrd for HeadEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeadEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.change.sort_key(), self.source).cmp(&(other.change.sort_key(), other.source))
    }
}

/// Streaming k-way merge over sorted sources.
///
/// Holds exactly one head entry per non-exhausted source in a min-heap.
/// Popping the minimum and refilling from the same source yields the union
/// of all sources in global `(commit_ts, start_ts)` order.
#[derive(Debug)]
pub struct KwayMerge {
    sources: Vec<MergeSource>,
    heap: BinaryHeap<Reverse<HeadEntry>>,
}

impl KwayMerge {
    /// Builds the merge by priming the heap with each source's head.
    pub async fn new(sources: Vec<MergeSource>) -> PitrResult<Self> {
        let mut merge = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
        };
        for source in 0..merge.sources.len() {
            merge.refill(source).await?;
        }
        Ok(merge)
    }

    /// Pulls the next change in global order, or [`None`] when all sources
    /// are exhausted.
    pub async fn try_next(&mut self) -> PitrResult<Option<CommittedChange>> {
        let Some(Reverse(head)) = self.heap.pop() else {
            return Ok(None);
        };
        self.refill(head.source).await?;

        Ok(Some(head.change))
    }

    async fn refill(&mut self, source: usize) -> PitrResult<()> {
        if let Some(change) = self.sources[source].next_change().await? {
            self.heap.push(Reverse(HeadEntry { change, source }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::SegmentWriter;

    fn change(commit_ts: u64, start_ts: u64, payload: &str) -> CommittedChange {
        CommittedChange {
            commit_ts,
            start_ts,
            database: "db1".to_string(),
            table: "t1".to_string(),
            payload: payload.to_string(),
        }
    }

    async fn write_segment(path: &Path, changes: &[CommittedChange]) {
        let mut writer = SegmentWriter::create(path).await.unwrap();
        for change in changes {
            writer.write(change).await.unwrap();
        }
        writer.finish().await.unwrap();
    }

    #[tokio::test]
    async fn merges_segments_and_resident_in_global_order() {
        let dir = tempfile::tempdir().unwrap();

        let first = dir.path().join("segment-000000.json");
        write_segment(&first, &[change(10, 9, "a"), change(40, 39, "d")]).await;
        let second = dir.path().join("segment-000001.json");
        write_segment(&second, &[change(20, 19, "b"), change(50, 49, "e")]).await;

        let sources = vec![
            MergeSource::open_segment(&first).await.unwrap(),
            MergeSource::open_segment(&second).await.unwrap(),
            MergeSource::resident(vec![change(30, 29, "c")]),
        ];

        let mut merge = KwayMerge::new(sources).await.unwrap();
        let mut order = Vec::new();
        while let Some(change) = merge.try_next().await.unwrap() {
            order.push(change.commit_ts);
        }
        assert_eq!(order, vec![10, 20, 30, 40, 50]);
    }

    #[tokio::test]
    async fn equal_keys_come_out_in_source_order() {
        let sources = vec![
            MergeSource::resident(vec![change(10, 5, "from-first")]),
            MergeSource::resident(vec![change(10, 5, "from-second")]),
        ];

        let mut merge = KwayMerge::new(sources).await.unwrap();
        let first = merge.try_next().await.unwrap().unwrap();
        let second = merge.try_next().await.unwrap().unwrap();
        assert_eq!(first.payload, "from-first");
        assert_eq!(second.payload, "from-second");
    }

    #[tokio::test]
    async fn empty_sources_yield_nothing() {
        let mut merge = KwayMerge::new(vec![MergeSource::resident(Vec::new())])
            .await
            .unwrap();
        assert!(merge.try_next().await.unwrap().is_none());
    }
}
