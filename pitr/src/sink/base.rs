use std::future::Future;

use crate::error::PitrResult;
use crate::types::CommittedChange;

/// Trait for systems that receive the recovered change stream.
///
/// [`Sink`] implementations define where the globally ordered, filtered
/// changes end up. Batches arrive in commit-timestamp order and each
/// `write_changes` call is awaited before the next batch is produced, so a
/// slow sink naturally applies backpressure to the reduce stage instead of
/// forcing it to buffer unboundedly.
pub trait Sink {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Writes one ordered batch of committed changes.
    fn write_changes(
        &self,
        changes: Vec<CommittedChange>,
    ) -> impl Future<Output = PitrResult<()>> + Send;

    /// Finalizes the sink after the last batch.
    ///
    /// Override this method if the sink needs to flush or close resources
    /// when the run completes. The default implementation is a no-op.
    fn shutdown(&self) -> impl Future<Output = PitrResult<()>> + Send {
        async { Ok(()) }
    }
}
