use std::path::Path;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::error::{ErrorKind, PitrResult};
use crate::pitr_error;
use crate::sink::Sink;
use crate::types::CommittedChange;

/// Sink writing the recovered stream as newline-delimited JSON.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: String,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl JsonFileSink {
    /// Creates the output file, truncating any previous content.
    pub async fn create(path: &Path) -> PitrResult<Self> {
        let file = File::create(path).await.map_err(|err| {
            pitr_error!(
                ErrorKind::SinkError,
                "failed to create output file",
                path.display(),
                source: err
            )
        })?;

        Ok(Self {
            path: path.display().to_string(),
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }
}

impl Sink for JsonFileSink {
    fn name() -> &'static str {
        "json_file"
    }

    async fn write_changes(&self, changes: Vec<CommittedChange>) -> PitrResult<()> {
        let mut writer = self.writer.lock().await;
        for change in &changes {
            let mut line = serde_json::to_string(change).map_err(|err| {
                pitr_error!(
                    ErrorKind::SinkError,
                    "failed to encode output record",
                    source: err
                )
            })?;
            line.push('\n');
            writer.write_all(line.as_bytes()).await.map_err(|err| {
                pitr_error!(
                    ErrorKind::SinkError,
                    "failed to write output file",
                    self.path.clone(),
                    source: err
                )
            })?;
        }

        Ok(())
    }

    async fn shutdown(&self) -> PitrResult<()> {
        self.writer.lock().await.flush().await.map_err(|err| {
            pitr_error!(
                ErrorKind::SinkError,
                "failed to flush output file",
                self.path.clone(),
                source: err
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_ordered_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recovered.json");

        let sink = JsonFileSink::create(&path).await.unwrap();
        sink.write_changes(vec![
            CommittedChange {
                commit_ts: 10,
                start_ts: 9,
                database: "db1".to_string(),
                table: "t1".to_string(),
                payload: "a".to_string(),
            },
            CommittedChange {
                commit_ts: 20,
                start_ts: 19,
                database: "db1".to_string(),
                table: "t1".to_string(),
                payload: "b".to_string(),
            },
        ])
        .await
        .unwrap();
        sink.shutdown().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let commit_ts: Vec<u64> = content
            .lines()
            .map(|line| {
                serde_json::from_str::<CommittedChange>(line)
                    .unwrap()
                    .commit_ts
            })
            .collect();
        assert_eq!(commit_ts, vec![10, 20]);
    }
}
