use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::types::CommittedChange;

/// Writer of one sorted segment file.
///
/// Segments are internal run-scoped files, one JSON-encoded change per
/// line, written in ascending `(commit_ts, start_ts)` order by the spiller.
#[derive(Debug)]
pub struct SegmentWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SegmentWriter {
    /// Creates the segment file, truncating any previous content.
    pub async fn create(path: &Path) -> PitrResult<Self> {
        let file = File::create(path).await.map_err(|err| {
            pitr_error!(
                ErrorKind::SegmentIo,
                "failed to create segment file",
                path.display(),
                source: err
            )
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Appends one change to the segment.
    pub async fn write(&mut self, change: &CommittedChange) -> PitrResult<()> {
        let mut line = serde_json::to_string(change).map_err(|err| {
            pitr_error!(
                ErrorKind::SerializationError,
                "failed to encode segment record",
                source: err
            )
        })?;
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await.map_err(|err| {
            pitr_error!(
                ErrorKind::SegmentIo,
                "failed to write segment file",
                self.path.display(),
                source: err
            )
        })
    }

    /// Flushes buffered writes and returns the segment path.
    pub async fn finish(mut self) -> PitrResult<PathBuf> {
        self.writer.flush().await.map_err(|err| {
            pitr_error!(
                ErrorKind::SegmentIo,
                "failed to flush segment file",
                self.path.display(),
                source: err
            )
        })?;

        Ok(self.path)
    }
}

/// Lazy reader of one segment file.
#[derive(Debug)]
pub struct SegmentReader {
    path: String,
    reader: BufReader<File>,
    line: String,
}

impl SegmentReader {
    /// Opens a segment for sequential reading.
    pub async fn open(path: &Path) -> PitrResult<Self> {
        let file = File::open(path).await.map_err(|err| {
            pitr_error!(
                ErrorKind::SegmentIo,
                "failed to open segment file",
                path.display(),
                source: err
            )
        })?;

        Ok(Self {
            path: path.display().to_string(),
            reader: BufReader::new(file),
            line: String::new(),
        })
    }

    /// Reads the next change, or returns [`None`] at end of segment.
    pub async fn next_change(&mut self) -> PitrResult<Option<CommittedChange>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await.map_err(|err| {
                pitr_error!(
                    ErrorKind::SegmentIo,
                    "failed to read segment file",
                    self.path.clone(),
                    source: err
                )
            })?;
            if read == 0 {
                return Ok(None);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|err| {
                    pitr_error!(
                        ErrorKind::SegmentIo,
                        "corrupt segment record",
                        self.path.clone(),
                        source: err
                    )
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(commit_ts: u64, start_ts: u64) -> CommittedChange {
        CommittedChange {
            commit_ts,
            start_ts,
            database: "db1".to_string(),
            table: "t1".to_string(),
            payload: format!("row-{commit_ts}"),
        }
    }

    #[tokio::test]
    async fn writes_and_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment-000001.json");

        let mut writer = SegmentWriter::create(&path).await.unwrap();
        for commit_ts in [10, 20, 30] {
            writer.write(&change(commit_ts, commit_ts - 1)).await.unwrap();
        }
        writer.finish().await.unwrap();

        let mut reader = SegmentReader::open(&path).await.unwrap();
        let mut seen = Vec::new();
        while let Some(change) = reader.next_change().await.unwrap() {
            seen.push(change.commit_ts);
        }
        assert_eq!(seen, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn corrupt_segment_surfaces_segment_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment-000001.json");
        std::fs::write(&path, "not json\n").unwrap();

        let mut reader = SegmentReader::open(&path).await.unwrap();
        let err = reader.next_change().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SegmentIo);
    }
}
