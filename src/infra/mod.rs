//! Infrastructure - configuration and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `metrics` - Lock-free scan metrics
//! - `logging` - tracing subscriber setup shared by the binaries

pub mod config;
pub mod logging;
pub mod metrics;

// Re-export commonly used types
pub use config::{AdminCredentials, Config, Messages, RestartPolicy, SpeechConfig};
pub use metrics::{Metrics, MetricsSummary, ScanResolution};
