use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader, SeekFrom};

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::types::RawRecord;

/// Serializes a record into its single-line file representation.
pub fn encode_record(record: &RawRecord) -> PitrResult<String> {
    serde_json::to_string(record).map_err(|err| {
        pitr_error!(
            ErrorKind::SerializationError,
            "failed to encode binlog record",
            source: err
        )
    })
}

/// Lazy decoder of [`RawRecord`]s from one binlog file.
///
/// The sequence is finite and restartable from a byte offset. Decode errors
/// are surfaced with the file and offset, never skipped: a silently dropped
/// record would make the merge incomplete.
#[derive(Debug)]
pub struct RecordDecoder {
    path: String,
    reader: BufReader<File>,
    offset: u64,
    line: String,
}

impl RecordDecoder {
    /// Opens a decoder at the start of the file.
    pub async fn open(path: &Path) -> PitrResult<Self> {
        Self::open_at(path, 0).await
    }

    /// Opens a decoder at a byte offset, which must point at the start of a
    /// record.
    pub async fn open_at(path: &Path, offset: u64) -> PitrResult<Self> {
        let mut file = File::open(path).await.map_err(|err| {
            pitr_error!(
                ErrorKind::IoError,
                "failed to open binlog file",
                path.display(),
                source: err
            )
        })?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await.map_err(|err| {
                pitr_error!(
                    ErrorKind::IoError,
                    "failed to seek binlog file",
                    format!("{} at byte {offset}", path.display()),
                    source: err
                )
            })?;
        }

        Ok(Self {
            path: path.display().to_string(),
            reader: BufReader::new(file),
            offset,
            line: String::new(),
        })
    }

    /// Returns the byte offset of the next record to be decoded.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Decodes the next record, or returns [`None`] at end of file.
    pub async fn next_record(&mut self) -> PitrResult<Option<RawRecord>> {
        loop {
            self.line.clear();
            let record_offset = self.offset;

            let read = self.reader.read_line(&mut self.line).await.map_err(|err| {
                pitr_error!(
                    ErrorKind::IoError,
                    "failed to read binlog file",
                    format!("{} at byte {record_offset}", self.path),
                    source: err
                )
            })?;
            if read == 0 {
                return Ok(None);
            }
            self.offset += read as u64;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut record: RawRecord = serde_json::from_str(trimmed).map_err(|err| {
                pitr_error!(
                    ErrorKind::DecodeError,
                    "malformed binlog record",
                    format!("{} at byte {record_offset}", self.path),
                    source: err
                )
            })?;
            record.source_file = self.path.clone();
            record.source_offset = record_offset;

            return Ok(Some(record));
        }
    }
}
