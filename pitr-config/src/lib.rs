//! Configuration types and loading for the PITR recovery toolchain.
//!
//! Configuration is layered: a `base` file, an environment-specific overlay
//! (dev/prod), and `APP`-prefixed environment variable overrides. The shared
//! structs in [`shared`] are consumed by both the core engine and the
//! `pitr-recover` binary.

pub mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from_dir};
