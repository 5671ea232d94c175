use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::warn;

use crate::binlog::RecordDecoder;
use crate::error::{ErrorKind, PitrError, PitrResult};
use crate::pitr_error;
use crate::types::{RawRecord, RecordKind, Tso};

/// How many bytes are read from the end of a file to find its last commit
/// timestamp without decoding the whole file.
const TAIL_PROBE_BYTES: u64 = 64 * 1024;

/// File extension identifying binlog files in the data directory.
///
/// Writer nodes name their logs `<node>.binlog`; everything else in the
/// directory (schema files, retained outputs, editor droppings) is not
/// input and must not be probed.
const BINLOG_EXTENSION: &str = "binlog";

/// Metadata of one candidate binlog file.
#[derive(Debug, Clone)]
pub struct BinlogFileMeta {
    /// Path of the file.
    pub path: PathBuf,
    /// Inclusive `(min, max)` commit-timestamp range of the file, or [`None`]
    /// when the file holds no commit or ddl records. Files without a known
    /// range are always kept by selection, since they may still hold prepares
    /// whose commits live elsewhere.
    pub commit_range: Option<(Tso, Tso)>,
    /// File size in bytes, used to size map memory budgets.
    pub size: u64,
}

/// Result of scanning a binlog directory.
///
/// A corrupt file yields a per-file error here rather than failing the whole
/// listing; the caller decides whether the run can proceed.
#[derive(Debug, Default)]
pub struct DirScan {
    /// Files with successfully probed metadata, ordered by name.
    pub files: Vec<BinlogFileMeta>,
    /// Files that could not be probed, with the cause.
    pub corrupt: Vec<(PathBuf, PitrError)>,
}

/// Lists the binlog files in a directory with their commit-timestamp ranges.
///
/// Only files carrying the binlog extension are considered; other files
/// sharing the directory are ignored. The range of each file is derived
/// from a cheap probe of its first and last commit records, not a full
/// decode.
pub async fn scan_dir(dir: &Path) -> PitrResult<DirScan> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to list binlog directory",
            dir.display(),
            source: err
        )
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to list binlog directory",
            dir.display(),
            source: err
        )
    })? {
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_none_or(|name| name.starts_with('.'));
        let is_binlog = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension == BINLOG_EXTENSION);
        if path.is_file() && !hidden && is_binlog {
            paths.push(path);
        }
    }
    paths.sort();

    let mut scan = DirScan::default();
    for path in paths {
        match probe_file(&path).await {
            Ok(meta) => scan.files.push(meta),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping unreadable binlog file in listing");
                scan.corrupt.push((path, err));
            }
        }
    }

    Ok(scan)
}

/// Probes one file for its commit-timestamp range.
async fn probe_file(path: &Path) -> PitrResult<BinlogFileMeta> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|err| {
            pitr_error!(
                ErrorKind::IoError,
                "failed to stat binlog file",
                path.display(),
                source: err
            )
        })?
        .len();

    // Forward probe: first record carrying a commit timestamp.
    let mut decoder = RecordDecoder::open(path).await?;
    let mut min_ts = None;
    while let Some(record) = decoder.next_record().await? {
        if let Some(ts) = committed_ts(&record) {
            min_ts = Some(ts);
            break;
        }
    }

    let Some(min_ts) = min_ts else {
        // Exhausted without a commit record.
        return Ok(BinlogFileMeta {
            path: path.to_path_buf(),
            commit_range: None,
            size,
        });
    };

    let max_ts = match probe_tail(path, size).await? {
        Some(ts) => ts,
        // The tail window held no complete commit record; fall back to a
        // full forward scan.
        None => {
            let mut max_ts = min_ts;
            while let Some(record) = decoder.next_record().await? {
                if let Some(ts) = committed_ts(&record) {
                    max_ts = ts;
                }
            }
            max_ts
        }
    };

    Ok(BinlogFileMeta {
        path: path.to_path_buf(),
        commit_range: Some((min_ts, max_ts)),
        size,
    })
}

/// Reads the tail of the file and returns the commit timestamp of the last
/// commit record found there, if any complete one is present.
async fn probe_tail(path: &Path, size: u64) -> PitrResult<Option<Tso>> {
    let start = size.saturating_sub(TAIL_PROBE_BYTES);

    let mut file = File::open(path).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to open binlog file",
            path.display(),
            source: err
        )
    })?;
    file.seek(SeekFrom::Start(start)).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to seek binlog file",
            path.display(),
            source: err
        )
    })?;

    let mut tail = String::new();
    file.read_to_string(&mut tail).await.map_err(|err| {
        pitr_error!(
            ErrorKind::DecodeError,
            "binlog file tail is not valid UTF-8",
            path.display(),
            source: err
        )
    })?;

    let mut lines: Vec<&str> = tail.lines().collect();
    if start > 0 && !lines.is_empty() {
        // The window almost certainly starts mid-record; drop the partial
        // first line.
        lines.remove(0);
    }

    for line in lines.iter().rev() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(trimmed).map_err(|err| {
            pitr_error!(
                ErrorKind::DecodeError,
                "malformed binlog record",
                format!("{} in tail probe", path.display()),
                source: err
            )
        })?;
        if let Some(ts) = committed_ts(&record) {
            return Ok(Some(ts));
        }
    }

    Ok(None)
}

/// Commit timestamp of a record, when it carries one.
fn committed_ts(record: &RawRecord) -> Option<Tso> {
    match record.kind {
        RecordKind::Commit | RecordKind::Ddl => Some(record.commit_ts),
        RecordKind::Prepare | RecordKind::Rollback => None,
    }
}
