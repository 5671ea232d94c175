use pitr::pipeline::Pipeline;
use pitr::sink::Sink;
use pitr::sink::json_file::JsonFileSink;
use pitr::sink::memory::MemorySink;
use pitr_config::load_config;
use pitr_config::shared::{RecoverConfig, SinkConfig};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

/// Runs one recovery from the loaded configuration.
pub async fn start_recovery() -> anyhow::Result<()> {
    let config: RecoverConfig = load_config()?;
    config.validate()?;

    // Static dispatch per sink type, the same way destinations are wired.
    match config.sink.clone() {
        SinkConfig::Memory => {
            let sink = MemorySink::new();
            run_pipeline(Pipeline::new(config, sink)).await
        }
        SinkConfig::JsonFile { path } => {
            let sink = JsonFileSink::create(&path).await?;
            run_pipeline(Pipeline::new(config, sink)).await
        }
    }
}

/// Runs a pipeline and cancels it on SIGINT or SIGTERM.
async fn run_pipeline<K>(pipeline: Pipeline<K>) -> anyhow::Result<()>
where
    K: Sink + Clone + Send + Sync + 'static,
{
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        // SIGTERM is what orchestrators send before SIGKILL; cancelling the
        // run early lets cleanup remove the temp directory in time.
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                warn!(error = %err, "failed to register sigterm handler");
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, cancelling recovery");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, cancelling recovery");
            }
        }

        if !shutdown_tx.shutdown() {
            info!("recovery already finished, nothing to cancel");
        }
    });

    let result = pipeline.run().await;

    // The signal task may still be waiting; the run is over either way.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    let summary = result?;
    info!(summary = %serde_json::to_string(&summary)?, "recovery finished");

    Ok(())
}
