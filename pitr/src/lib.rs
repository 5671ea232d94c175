//! Point-in-time-recovery merge engine for per-node binlog files.
//!
//! Independent writers of a distributed database each produce an append-only
//! binlog. This crate reconstructs one globally commit-timestamp-ordered
//! change stream from those files, restricted to a caller-specified window,
//! and replays schema history so every row change is interpreted under the
//! schema version that was active when it committed.
//!
//! The engine is a two-phase batch pipeline: a map phase matches two-phase
//! commit record pairs and spills sorted segment files under a memory budget,
//! then a reduce phase k-way merges the segments, drives schema replay and
//! table filtering, and streams the result to a [`sink::Sink`].

pub mod binlog;
pub mod concurrency;
pub mod error;
pub mod filter;
mod macros;
pub mod matcher;
pub mod merge;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod types;
