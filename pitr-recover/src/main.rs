//! Point-in-time recovery binary.
//!
//! Loads the recovery configuration, initializes telemetry, wires the
//! configured sink and runs one merge pipeline to completion. SIGINT and
//! SIGTERM cancel the run; the pipeline cleans up its temporary files on
//! every exit path.

use pitr_telemetry::tracing::init_tracing;

mod core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(env!("CARGO_BIN_NAME"));

    core::start_recovery().await
}
