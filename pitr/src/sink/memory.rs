use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::PitrResult;
use crate::sink::Sink;
use crate::types::CommittedChange;

/// In-memory sink for testing and development purposes.
///
/// Captures every batch so tests can assert on the exact ordered output of
/// a run. Cloning shares the underlying buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<CommittedChange>>>,
}

impl MemorySink {
    /// Creates a new empty memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all captured changes, in arrival order.
    pub async fn changes(&self) -> Vec<CommittedChange> {
        self.inner.lock().await.clone()
    }
}

impl Sink for MemorySink {
    fn name() -> &'static str {
        "memory"
    }

    async fn write_changes(&self, changes: Vec<CommittedChange>) -> PitrResult<()> {
        info!(batch_size = changes.len(), "writing changes to memory sink");
        self.inner.lock().await.extend(changes);

        Ok(())
    }
}
