use std::path::Path;

use tracing::info;

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::types::{SchemaEvent, TimeWindow};

/// Loads a fixed base-schema file: one DDL descriptor per line.
///
/// Every line counts as pre-applied before the window starts, so events get
/// `finished_ts = 0` and sequential versions in file order. Blank lines and
/// `#` comments are skipped.
pub async fn load_base_schema(path: &Path) -> PitrResult<Vec<SchemaEvent>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to read base schema file",
            path.display(),
            source: err
        )
    })?;

    let mut events = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        events.push(SchemaEvent {
            version: events.len() as i64 + 1,
            finished_ts: 0,
            ddl: trimmed.to_string(),
        });
    }

    info!(path = %path.display(), events = events.len(), "loaded base schema");

    Ok(events)
}

/// Loads a schema-history file: a JSON array of events with explicit
/// versions and completion timestamps.
///
/// Events are sorted by version, which is the authoritative history order.
/// Events completing after the window end can never affect a change inside
/// the window and are dropped.
pub async fn load_history_file(path: &Path, window: TimeWindow) -> PitrResult<Vec<SchemaEvent>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|err| {
        pitr_error!(
            ErrorKind::IoError,
            "failed to read schema history file",
            path.display(),
            source: err
        )
    })?;

    let mut events: Vec<SchemaEvent> = serde_json::from_str(&content).map_err(|err| {
        pitr_error!(
            ErrorKind::DeserializationError,
            "malformed schema history file",
            path.display(),
            source: err
        )
    })?;

    events.sort_by_key(|event| event.version);
    let total = events.len();
    events.retain(|event| window.stop_ts == 0 || event.finished_ts <= window.stop_ts);

    info!(
        path = %path.display(),
        events = events.len(),
        dropped = total - events.len(),
        "loaded schema history"
    );

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn base_schema_assigns_sequential_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.sql");
        std::fs::write(
            &path,
            "# base schema\ncreate database orders\n\ncreate table orders.items\n",
        )
        .unwrap();

        let events = load_base_schema(&path).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[1].version, 2);
        assert!(events.iter().all(|event| event.finished_ts == 0));
    }

    #[tokio::test]
    async fn history_is_sorted_and_bounded_by_window_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            serde_json::json!([
                { "version": 2, "finished_ts": 8, "ddl": "create table orders.items" },
                { "version": 1, "finished_ts": 3, "ddl": "create database orders" },
                { "version": 3, "finished_ts": 99, "ddl": "drop table orders.items" },
            ])
            .to_string(),
        )
        .unwrap();

        let window = TimeWindow { start_ts: 5, stop_ts: 20 };
        let events = load_history_file(&path, window).await.unwrap();
        let versions: Vec<_> = events.iter().map(|event| event.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[tokio::test]
    async fn malformed_history_surfaces_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();

        let window = TimeWindow { start_ts: 0, stop_ts: 0 };
        let err = load_history_file(&path, window).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
