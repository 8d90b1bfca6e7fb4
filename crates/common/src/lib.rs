//! Common configuration and telemetry shared across chirp crates.
//!
//! - **Configuration**: search source settings and app config loading (`config`).
//! - **Telemetry**: tracing subscriber setup for binaries (`telemetry`).
pub mod config;
pub mod telemetry;
