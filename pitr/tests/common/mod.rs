#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use pitr::binlog::encode_record;
use pitr::pipeline::Pipeline;
use pitr::sink::memory::MemorySink;
use pitr::types::{CommittedChange, RawRecord, RecordKind, RunSummary, Tso};
use pitr_config::shared::{
    BatchConfig, FilterConfig, PipelineConfig, RecoverConfig, SchemaSourceConfig, SinkConfig,
    SpillConfig,
};
use rand::random;

/// Builds a prepare record for the given transaction.
pub fn prepare(start_ts: Tso, database: &str, table: &str, payload: &str) -> RawRecord {
    RawRecord {
        kind: RecordKind::Prepare,
        start_ts,
        commit_ts: 0,
        database: database.to_string(),
        table: table.to_string(),
        payload: payload.to_string(),
        source_file: String::new(),
        source_offset: 0,
    }
}

/// Builds a commit record resolving `start_ts` at `commit_ts`.
pub fn commit(start_ts: Tso, commit_ts: Tso) -> RawRecord {
    RawRecord {
        kind: RecordKind::Commit,
        start_ts,
        commit_ts,
        database: String::new(),
        table: String::new(),
        payload: String::new(),
        source_file: String::new(),
        source_offset: 0,
    }
}

/// Builds a rollback record aborting `start_ts`.
pub fn rollback(start_ts: Tso) -> RawRecord {
    RawRecord {
        kind: RecordKind::Rollback,
        start_ts,
        commit_ts: 0,
        database: String::new(),
        table: String::new(),
        payload: String::new(),
        source_file: String::new(),
        source_offset: 0,
    }
}

/// Builds a schema-change record completing at `commit_ts`.
pub fn ddl(commit_ts: Tso, statement: &str) -> RawRecord {
    RawRecord {
        kind: RecordKind::Ddl,
        start_ts: commit_ts,
        commit_ts,
        database: String::new(),
        table: String::new(),
        payload: statement.to_string(),
        source_file: String::new(),
        source_offset: 0,
    }
}

/// Writes one binlog file with the given records, one per line.
pub fn write_binlog(dir: &Path, name: &str, records: &[RawRecord]) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    for record in records {
        writeln!(file, "{}", encode_record(record).unwrap()).unwrap();
    }
}

/// Builds a recovery configuration over `data_dir` with a memory sink and
/// no filtering or schema replay.
pub fn recover_config(data_dir: &Path, start_tso: Tso, stop_tso: Tso) -> RecoverConfig {
    RecoverConfig {
        pipeline: PipelineConfig {
            id: random(),
            data_dir: data_dir.to_path_buf(),
            start_tso,
            stop_tso,
            spill: SpillConfig::default(),
            batch: BatchConfig { max_size: 2 },
            temp_dir: None,
            retain_temp_dir: false,
        },
        filter: FilterConfig::default(),
        schema: SchemaSourceConfig::None,
        sink: SinkConfig::Memory,
    }
}

/// Runs one recovery into a memory sink and returns its summary and the
/// captured ordered output.
pub async fn run_to_memory(config: RecoverConfig) -> (RunSummary, Vec<CommittedChange>) {
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(config, sink.clone());
    let summary = pipeline.run().await.unwrap();

    (summary, sink.changes().await)
}

/// Subdirectories of `dir`, used to assert that no run-scoped temp
/// directories are left behind.
pub fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_dir())
        .collect()
}
