//! Structured logging setup
//!
//! Level comes from RUST_LOG, default INFO. Use RUST_LOG=debug to see
//! ignored scans and timer events.

use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Log to an append-only file, for binaries that own the terminal
pub fn init_file(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(())
}
