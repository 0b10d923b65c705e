//! Scan processor - turns a decoded barcode into a check-in outcome
//!
//! Two states, Idle and Processing. Admission in Idle hands out the only
//! `InFlight` ticket; settling consumes it and returns to Idle. While a
//! ticket is out, further input is ignored, so a second request can never
//! overlap the first.

use crate::domain::types::{
    Barcode, FallbackList, MessageKind, Notification, ScanId, VerifyResponse,
};
use crate::infra::config::Messages;
use crate::infra::metrics::ScanResolution;
use crate::io::verifier::VerifyError;
use chrono::{DateTime, Local};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Processing { scan_id: ScanId, barcode: Barcode },
}

/// Proof that a verification is outstanding
///
/// Not `Clone`; only [`ScanProcessor::admit`] creates one.
#[derive(Debug)]
pub struct InFlight {
    scan_id: ScanId,
    barcode: Barcode,
    started_at: Instant,
}

impl InFlight {
    pub fn scan_id(&self) -> ScanId {
        self.scan_id
    }

    pub fn barcode(&self) -> &Barcode {
        &self.barcode
    }
}

#[derive(Debug)]
pub enum Admission {
    /// Now Processing; verify `ticket.barcode()` and settle with the ticket
    Started { ticket: InFlight, message: String },
    /// A scan is already in flight; input discarded
    Ignored,
    /// Nothing left after trimming
    Blank,
}

/// Everything the kiosk shows or triggers for one settled scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub scan_id: ScanId,
    pub barcode: Barcode,
    pub resolution: ScanResolution,
    pub kind: MessageKind,
    pub message: String,
    /// Text to speak, for welcome outcomes
    pub announcement: Option<String>,
    pub notification: Option<Notification>,
    pub latency_ms: u64,
}

pub struct ScanProcessor {
    state: ScanState,
    fallback: FallbackList,
    messages: Messages,
}

impl ScanProcessor {
    pub fn new(fallback: FallbackList, messages: Messages) -> Self {
        info!(fallback_entries = %fallback.len(), "scan_processor_initialized");
        Self { state: ScanState::Idle, fallback, messages }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, ScanState::Processing { .. })
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Accept decoded input if Idle
    pub fn admit(&mut self, raw: &str) -> Admission {
        if let ScanState::Processing { scan_id, .. } = &self.state {
            debug!(in_flight = %scan_id, "scan_ignored_while_processing");
            return Admission::Ignored;
        }

        let Some(barcode) = Barcode::parse(raw) else {
            return Admission::Blank;
        };

        let scan_id = ScanId::generate();
        info!(scan_id = %scan_id, barcode = %barcode, "scan_admitted");
        self.state = ScanState::Processing { scan_id, barcode: barcode.clone() };

        Admission::Started {
            ticket: InFlight { scan_id, barcode, started_at: Instant::now() },
            message: self.messages.processing.clone(),
        }
    }

    /// Settle the outstanding scan and return to Idle
    pub fn settle(
        &mut self,
        ticket: InFlight,
        result: Result<VerifyResponse, VerifyError>,
        now: DateTime<Local>,
    ) -> ScanOutcome {
        self.state = ScanState::Idle;
        let latency_ms = ticket.started_at.elapsed().as_millis() as u64;
        let InFlight { scan_id, barcode, .. } = ticket;

        let outcome = match result {
            Ok(VerifyResponse::Found { name }) => {
                self.welcome(scan_id, barcode, &name, ScanResolution::Verified, now, latency_ms)
            }
            Ok(VerifyResponse::NotFound) => match self.fallback.lookup(&barcode) {
                Some(name) => {
                    let name = name.to_string();
                    info!(scan_id = %scan_id, barcode = %barcode, "scan_fallback_match");
                    self.welcome(scan_id, barcode, &name, ScanResolution::Fallback, now, latency_ms)
                }
                None => self.plain(
                    scan_id,
                    barcode,
                    ScanResolution::NotRecognized,
                    MessageKind::NotRecognized,
                    latency_ms,
                ),
            },
            Err(e) => {
                warn!(scan_id = %scan_id, barcode = %barcode, error = %e, "scan_verify_failed");
                self.plain(scan_id, barcode, ScanResolution::Failed, MessageKind::Retry, latency_ms)
            }
        };

        info!(
            scan_id = %outcome.scan_id,
            barcode = %outcome.barcode,
            resolution = ?outcome.resolution,
            latency_ms = %outcome.latency_ms,
            "scan_settled"
        );
        outcome
    }

    fn welcome(
        &self,
        scan_id: ScanId,
        barcode: Barcode,
        name: &str,
        resolution: ScanResolution,
        now: DateTime<Local>,
        latency_ms: u64,
    ) -> ScanOutcome {
        let text = format!(
            "{} at {}",
            Messages::render(&self.messages.notification, name),
            now.format("%Y-%m-%d %H:%M:%S")
        );
        ScanOutcome {
            scan_id,
            barcode,
            resolution,
            kind: MessageKind::Welcome,
            message: Messages::render(&self.messages.welcome, name),
            announcement: Some(Messages::render(&self.messages.announcement, name)),
            notification: Some(Notification { name: name.to_string(), checked_in_at: now, text }),
            latency_ms,
        }
    }

    fn plain(
        &self,
        scan_id: ScanId,
        barcode: Barcode,
        resolution: ScanResolution,
        kind: MessageKind,
        latency_ms: u64,
    ) -> ScanOutcome {
        let message = match kind {
            MessageKind::NotRecognized => self.messages.not_recognized.clone(),
            _ => self.messages.retry.clone(),
        };
        ScanOutcome {
            scan_id,
            barcode,
            resolution,
            kind,
            message,
            announcement: None,
            notification: None,
            latency_ms,
        }
    }
}
