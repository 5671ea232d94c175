use pitr::error::ErrorKind;
use pitr::pipeline::Pipeline;
use pitr::sink::memory::MemorySink;
use pitr_config::shared::{SchemaSourceConfig, SpillConfig};
use pitr_telemetry::tracing::init_test_tracing;

use crate::common::{
    commit, ddl, prepare, recover_config, rollback, run_to_memory, subdirectories, write_binlog,
};

mod common;

#[tokio::test(flavor = "multi_thread")]
async fn merges_interleaved_files_in_commit_order() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            prepare(5, "db1", "t1", "T1"),
            commit(5, 10),
            prepare(6, "db1", "t1", "aborted"),
            rollback(6),
        ],
    );
    write_binlog(
        dir.path(),
        "node-2.binlog",
        &[prepare(7, "db1", "t1", "T2"), commit(7, 12)],
    );

    let (summary, changes) = run_to_memory(recover_config(dir.path(), 0, 0)).await;

    assert_eq!(summary.emitted_changes, 2);
    let emitted: Vec<_> = changes
        .iter()
        .map(|change| (change.commit_ts, change.payload.as_str()))
        .collect();
    assert_eq!(emitted, vec![(10, "T1"), (12, "T2")]);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn matches_prepare_and_commit_across_files() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    // One pair per direction: the commit of txn 5 lives in a later file,
    // the commit of txn 6 in an earlier one. Whichever worker runs first,
    // neither committed transaction may be dropped as an orphan.
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "prepare-first"), commit(6, 12)],
    );
    write_binlog(
        dir.path(),
        "node-2.binlog",
        &[commit(5, 10), prepare(6, "db1", "t1", "commit-first")],
    );

    let (summary, changes) = run_to_memory(recover_config(dir.path(), 0, 0)).await;

    assert_eq!(summary.emitted_changes, 2);
    assert_eq!(summary.orphan_commits, 0);
    assert_eq!(summary.unresolved_prepares, 0);
    let emitted: Vec<_> = changes
        .iter()
        .map(|change| (change.commit_ts, change.payload.as_str()))
        .collect();
    assert_eq!(emitted, vec![(10, "prepare-first"), (12, "commit-first")]);
}

#[tokio::test(flavor = "multi_thread")]
async fn schema_event_is_active_before_dependent_change() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(9, "orders", "items", "row"), commit(9, 10)],
    );

    let history = dir.path().join("history.json");
    std::fs::write(
        &history,
        serde_json::json!([
            { "version": 1, "finished_ts": 1, "ddl": "create database orders" },
            { "version": 2, "finished_ts": 8, "ddl": "create table orders.items" },
        ])
        .to_string(),
    )
    .unwrap();

    let mut config = recover_config(dir.path(), 5, 20);
    config.schema = SchemaSourceConfig::HistoryFile { path: history };

    let (summary, changes) = run_to_memory(config).await;

    // Version 1 predates the window and forms the base; version 2 finishes
    // at 8 and must be applied before the change at 10 is emitted.
    assert_eq!(summary.ddls_applied, 1);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].commit_ts, 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn fails_when_no_file_overlaps_the_window() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "old"), commit(5, 10)],
    );

    let sink = MemorySink::new();
    let pipeline = Pipeline::new(recover_config(dir.path(), 100, 0), sink);
    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoInputFiles);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn spilled_segments_still_merge_in_global_order() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    // Commit timestamps deliberately out of arrival order.
    let commits = [50, 10, 90, 30, 70, 20, 80, 40, 60];
    let mut records = Vec::new();
    for (index, commit_ts) in commits.iter().enumerate() {
        let start_ts = 1000 + index as u64;
        records.push(prepare(start_ts, "db1", "t1", &format!("row-{commit_ts}")));
        records.push(commit(start_ts, *commit_ts));
    }
    write_binlog(dir.path(), "node-1.binlog", &records);

    let mut config = recover_config(dir.path(), 0, 0);
    config.pipeline.spill = SpillConfig {
        memory_bytes: SpillConfig::DEFAULT_MEMORY_BYTES,
        max_records: 3,
    };

    let (summary, changes) = run_to_memory(config).await;

    assert_eq!(summary.segments_spilled, 3);
    assert_eq!(summary.emitted_changes, 9);
    let order: Vec<_> = changes.iter().map(|change| change.commit_ts).collect();
    assert_eq!(order, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn deny_list_wins_over_allow_list() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            prepare(5, "db1", "t1", "denied"),
            commit(5, 10),
            prepare(6, "db1", "t2", "allowed"),
            commit(6, 12),
        ],
    );

    let mut config = recover_config(dir.path(), 0, 0);
    config.filter.do_dbs = vec!["db1".to_string()];
    config.filter.ignore_tables = vec!["db1.t1".to_string()];

    let (summary, changes) = run_to_memory(config).await;

    assert_eq!(summary.emitted_changes, 1);
    assert_eq!(summary.filtered_changes, 1);
    assert_eq!(changes[0].payload, "allowed");
}

#[tokio::test(flavor = "multi_thread")]
async fn window_bounds_are_inclusive() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            prepare(1, "db1", "t1", "before"),
            commit(1, 9),
            prepare(2, "db1", "t1", "at-start"),
            commit(2, 10),
            prepare(3, "db1", "t1", "at-stop"),
            commit(3, 20),
            prepare(4, "db1", "t1", "after"),
            commit(4, 21),
        ],
    );

    let (summary, changes) = run_to_memory(recover_config(dir.path(), 10, 20)).await;

    assert_eq!(summary.emitted_changes, 2);
    let payloads: Vec<_> = changes.iter().map(|change| change.payload.as_str()).collect();
    assert_eq!(payloads, vec!["at-start", "at-stop"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn transaction_preparing_before_the_window_is_recovered() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "spans-window"), commit(5, 15)],
    );

    let (summary, changes) = run_to_memory(recover_config(dir.path(), 10, 20)).await;

    assert_eq!(summary.emitted_changes, 1);
    assert_eq!(changes[0].payload, "spans-window");
}

#[tokio::test(flavor = "multi_thread")]
async fn orphan_commit_and_unresolved_prepare_are_counted() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            commit(99, 10),
            prepare(5, "db1", "t1", "done"),
            commit(5, 12),
            prepare(6, "db1", "t1", "never-resolved"),
        ],
    );

    let (summary, changes) = run_to_memory(recover_config(dir.path(), 0, 0)).await;

    assert_eq!(summary.emitted_changes, 1);
    assert_eq!(summary.orphan_commits, 1);
    assert_eq!(summary.unresolved_prepares, 1);
    assert_eq!(changes[0].payload, "done");
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_prepare_fails_and_cleans_up() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            prepare(5, "db1", "t1", "first"),
            prepare(5, "db1", "t1", "second"),
            commit(5, 10),
        ],
    );

    let sink = MemorySink::new();
    let pipeline = Pipeline::new(recover_config(dir.path(), 0, 0), sink);
    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupt_file_fails_the_run() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "row"), commit(5, 10)],
    );
    std::fs::write(dir.path().join("node-2.binlog"), "garbage\n").unwrap();

    let sink = MemorySink::new();
    let pipeline = Pipeline::new(recover_config(dir.path(), 0, 0), sink);
    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DecodeError);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn ddl_records_in_the_stream_are_replayed() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            ddl(8, "create table orders.items"),
            prepare(9, "orders", "items", "row"),
            commit(9, 10),
        ],
    );

    let base = dir.path().join("schema.sql");
    std::fs::write(&base, "create database orders\n").unwrap();

    let mut config = recover_config(dir.path(), 5, 20);
    config.schema = SchemaSourceConfig::BaseFile { path: base };

    let (summary, changes) = run_to_memory(config).await;

    assert_eq!(summary.ddls_applied, 1);
    assert_eq!(summary.emitted_changes, 1);
    assert_eq!(changes[0].commit_ts, 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_aborts_the_run_and_cleans_up() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "row"), commit(5, 10)],
    );

    let sink = MemorySink::new();
    let pipeline = Pipeline::new(recover_config(dir.path(), 0, 0), sink);

    // Cancel before the run observes its first record.
    pipeline.shutdown_tx().shutdown();
    let err = pipeline.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(subdirectories(dir.path()).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn retain_temp_dir_keeps_segments_for_diagnostics() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[prepare(5, "db1", "t1", "row"), commit(5, 10)],
    );

    let mut config = recover_config(dir.path(), 0, 0);
    config.pipeline.retain_temp_dir = true;

    let (summary, _) = run_to_memory(config).await;

    assert_eq!(summary.emitted_changes, 1);
    assert_eq!(subdirectories(dir.path()).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn reruns_over_the_same_input_produce_identical_output() {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    write_binlog(
        dir.path(),
        "node-1.binlog",
        &[
            prepare(5, "db1", "t1", "a"),
            commit(5, 10),
            prepare(6, "db1", "t1", "b"),
            commit(6, 12),
        ],
    );

    let (first_summary, first) = run_to_memory(recover_config(dir.path(), 0, 0)).await;
    let (second_summary, second) = run_to_memory(recover_config(dir.path(), 0, 0)).await;

    assert_eq!(first_summary, second_summary);
    assert_eq!(first, second);
}
