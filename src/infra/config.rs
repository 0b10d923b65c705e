//! Configuration loading from TOML files
//!
//! The binaries take the path from `--config`, then the CONFIG_FILE
//! environment variable, then `config/kiosk.toml` (see `DEFAULT_CONFIG_PATH`).

use crate::domain::types::{FallbackEntry, FallbackList};
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Config file used when neither `--config` nor CONFIG_FILE is given
pub const DEFAULT_CONFIG_PATH: &str = "config/kiosk.toml";

/// What happens to the scanner once a scan has settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Close after each scan; the operator reopens it
    #[default]
    Manual,
    /// Stay open and re-arm the inactivity timer
    KeepOpen,
    /// Close, then reopen once the announcement has finished
    ReopenAfterAnnouncement,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::Manual => "manual",
            RestartPolicy::KeepOpen => "keep_open",
            RestartPolicy::ReopenAfterAnnouncement => "reopen_after_announcement",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct KioskSection {
    #[serde(default = "default_kiosk_id")]
    pub id: String,
}

fn default_kiosk_id() -> String {
    "kiosk".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_inactivity_secs")]
    pub inactivity_secs: u64,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { inactivity_secs: default_inactivity_secs(), restart_policy: RestartPolicy::Manual }
    }
}

fn default_inactivity_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,
    /// espeak-compatible TTS binary
    #[serde(default = "default_speech_command")]
    pub command: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Multiplier, 1.0 = engine default
    #[serde(default = "default_unit")]
    pub rate: f32,
    /// Multiplier, 1.0 = engine default
    #[serde(default = "default_unit")]
    pub pitch: f32,
    /// Delay between end of speech and auto-clearing the message
    #[serde(default = "default_clear_delay_ms")]
    pub clear_delay_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            command: default_speech_command(),
            voice: default_voice(),
            rate: default_unit(),
            pitch: default_unit(),
            clear_delay_ms: default_clear_delay_ms(),
        }
    }
}

fn default_speech_enabled() -> bool {
    true
}

fn default_speech_command() -> String {
    "espeak".to_string()
}

fn default_voice() -> String {
    "en".to_string()
}

fn default_unit() -> f32 {
    1.0
}

fn default_clear_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_notification_ms")]
    pub duration_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { duration_ms: default_notification_ms() }
    }
}

fn default_notification_ms() -> u64 {
    5000
}

/// User-facing message texts. `{name}` is replaced with the guest name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub processing: String,
    pub welcome: String,
    pub announcement: String,
    pub notification: String,
    pub not_recognized: String,
    pub retry: String,
    pub inactivity: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            processing: "Processing...".to_string(),
            welcome: "Access Granted. Welcome {name}".to_string(),
            announcement: "Welcome {name}".to_string(),
            notification: "{name} checked in".to_string(),
            not_recognized: "Barcode not recognized. Please contact the admin.".to_string(),
            retry: "Error verifying guest. Please try again.".to_string(),
            inactivity: "Scanner closed due to inactivity. Press Start Scan to try again."
                .to_string(),
        }
    }
}

impl Messages {
    pub fn render(template: &str, name: &str) -> String {
        template.replace("{name}", name)
    }
}

/// Dashboard login pair. A plain compare, not an authentication mechanism.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_output")]
    pub output: String,
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { output: default_report_output(), rows_per_page: default_rows_per_page() }
    }
}

fn default_report_output() -> String {
    "guest_report.txt".to_string()
}

fn default_rows_per_page() -> usize {
    24
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub kiosk: KioskSection,
    pub verification: VerificationConfig,
    pub directory: Option<DirectoryConfig>,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub messages: Messages,
    pub admin: Option<AdminCredentials>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub fallback: Vec<FallbackEntry>,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    kiosk_id: String,
    verify_url: String,
    verify_timeout_ms: u64,
    directory_url: String,
    directory_timeout_ms: u64,
    inactivity_secs: u64,
    restart_policy: RestartPolicy,
    speech: SpeechConfig,
    notification_ms: u64,
    messages: Messages,
    admin: Option<AdminCredentials>,
    metrics_interval_secs: u64,
    report_output: String,
    report_rows_per_page: usize,
    fallback: Vec<FallbackEntry>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kiosk_id: default_kiosk_id(),
            verify_url: "http://localhost:8080/api/verify".to_string(),
            verify_timeout_ms: default_timeout_ms(),
            directory_url: "http://localhost:8080/api/check-in".to_string(),
            directory_timeout_ms: default_timeout_ms(),
            inactivity_secs: default_inactivity_secs(),
            restart_policy: RestartPolicy::Manual,
            speech: SpeechConfig::default(),
            notification_ms: default_notification_ms(),
            messages: Messages::default(),
            admin: None,
            metrics_interval_secs: default_metrics_interval(),
            report_output: default_report_output(),
            report_rows_per_page: default_rows_per_page(),
            fallback: Vec::new(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
            .map(|mut config| {
                config.config_file = path.display().to_string();
                config
            })
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        // Without a [directory] section the default local endpoint is used
        let (directory_url, directory_timeout_ms) = match toml_config.directory {
            Some(d) => (d.url, d.timeout_ms),
            None => (defaults.directory_url, defaults.directory_timeout_ms),
        };

        Ok(Self {
            kiosk_id: toml_config.kiosk.id,
            verify_url: toml_config.verification.url,
            verify_timeout_ms: toml_config.verification.timeout_ms,
            directory_url,
            directory_timeout_ms,
            inactivity_secs: toml_config.scanner.inactivity_secs,
            restart_policy: toml_config.scanner.restart_policy,
            speech: toml_config.speech,
            notification_ms: toml_config.notifications.duration_ms,
            messages: toml_config.messages,
            admin: toml_config.admin,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            report_output: toml_config.report.output,
            report_rows_per_page: toml_config.report.rows_per_page.max(1),
            fallback: toml_config.fallback,
            config_file: defaults.config_file,
        })
    }

    /// Load configuration from a path, falling back to defaults on error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Trimmed fallback allow-list
    pub fn fallback_list(&self) -> FallbackList {
        FallbackList::new(self.fallback.clone())
    }

    // Getters for all config fields
    pub fn kiosk_id(&self) -> &str {
        &self.kiosk_id
    }

    pub fn verify_url(&self) -> &str {
        &self.verify_url
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_millis(self.verify_timeout_ms)
    }

    pub fn directory_url(&self) -> &str {
        &self.directory_url
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_secs)
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    pub fn speech(&self) -> &SpeechConfig {
        &self.speech
    }

    pub fn message_clear_delay(&self) -> Duration {
        Duration::from_millis(self.speech.clear_delay_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn admin(&self) -> Option<&AdminCredentials> {
        self.admin.as_ref()
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn report_output(&self) -> &str {
        &self.report_output
    }

    pub fn report_rows_per_page(&self) -> usize {
        self.report_rows_per_page
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to set the fallback list
    pub fn with_fallback(mut self, fallback: Vec<FallbackEntry>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Builder method for tests to set the restart policy
    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Builder method for tests to set the inactivity timeout
    pub fn with_inactivity_secs(mut self, secs: u64) -> Self {
        self.inactivity_secs = secs;
        self
    }
}
