//! Domain models - guest, barcode and status message types
//!
//! This module contains the canonical data types used throughout the system:
//! - `Barcode` - trimmed decoder output, never empty
//! - `GuestRecord` - guest as listed by the remote directory
//! - `FallbackList` - static allow-list consulted on "not found"
//! - `StatusMessage` - the single message the kiosk shows
//! - `GuestQuery` - dashboard filter and sort

pub mod guests;
pub mod types;

pub use guests::{AttendanceSummary, GuestQuery, SortDirection, StatusFilter};
pub use types::{
    Barcode, FallbackEntry, FallbackList, GuestRecord, GuestStatus, MessageKind, Notification,
    ScanId, StatusMessage, VerifyResponse,
};
