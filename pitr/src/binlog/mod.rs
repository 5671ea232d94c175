//! Binlog file access: directory scanning and record decoding.
//!
//! Binlog files are newline-delimited JSON, one [`crate::types::RawRecord`]
//! per line, appended by each writer node in arrival order. Records are not
//! globally sorted across files; within one file, commit records appear in
//! the order the node committed them.

mod codec;
mod provider;

pub use codec::{RecordDecoder, encode_record};
pub use provider::{BinlogFileMeta, DirScan, scan_dir};
