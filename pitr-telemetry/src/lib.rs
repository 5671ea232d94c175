//! Telemetry initialization for the PITR recovery toolchain.

pub mod tracing;
