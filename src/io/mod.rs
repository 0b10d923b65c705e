//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `verifier` - Check-in verification against the hosted API (HTTP)
//! - `directory` - Guest list fetch for the dashboard (HTTP)
//! - `scanner` - Decoded barcode sources and the console router
//! - `announcer` - Speech output through an external TTS command
//! - `notifier` - Transient check-in notifications
//! - `report` - Attendance report export (plain text)

pub mod announcer;
pub mod directory;
pub mod notifier;
pub mod report;
pub mod scanner;
pub mod verifier;

// Re-export commonly used types
pub use announcer::{Announcer, CommandAnnouncer, SpeechDone, Utterance};
pub use directory::{GuestDirectory, HttpGuestDirectory};
pub use notifier::{LogNotifier, Notifier};
pub use report::AttendanceReport;
pub use scanner::{channel_scanner, run_console_router, ChannelScanner, ScannerSource};
pub use verifier::{HttpVerifier, VerifyError, Verifier};
