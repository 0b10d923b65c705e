//! Services - check-in logic and the kiosk event loop
//!
//! This module contains the core business logic services:
//! - `scan_processor` - Idle/Processing state machine and outcome messages
//! - `kiosk` - Event loop owning scanner visibility, timers and capabilities

pub mod kiosk;
pub mod scan_processor;

// Re-export commonly used types
pub use kiosk::{Kiosk, KioskCommand, KioskSettings, KioskView};
pub use scan_processor::{Admission, InFlight, ScanOutcome, ScanProcessor, ScanState};
