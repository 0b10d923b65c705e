//! Kiosk runtime - the event loop around the scan processor
//!
//! One task owns all kiosk state: scanner visibility, the visible status
//! message and both timers. Verification runs in a spawned task and its
//! result comes back through a channel, so the loop never blocks on the
//! network and scans decoded meanwhile are discarded by the processor.
//!
//! Timers are absolute deadlines in `Option<Instant>`. Arming replaces the
//! previous deadline, so at most one inactivity timer and one message
//! auto-clear timer exist at any time.

use crate::domain::types::{MessageKind, StatusMessage, VerifyResponse};
use crate::infra::config::{Config, RestartPolicy, SpeechConfig};
use crate::infra::metrics::Metrics;
use crate::io::announcer::{Announcer, Utterance};
use crate::io::notifier::{LogNotifier, Notifier};
use crate::io::scanner::ScannerSource;
use crate::io::verifier::{VerifyError, Verifier};
use crate::services::scan_processor::{Admission, InFlight, ScanProcessor};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Operator input to the kiosk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KioskCommand {
    OpenScanner,
    CloseScanner,
    DismissMessage,
    Shutdown,
}

/// What the kiosk screen shows, published on every change
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KioskView {
    pub scanner_open: bool,
    pub processing: bool,
    pub message: Option<StatusMessage>,
    pub last_barcode: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KioskSettings {
    pub inactivity: Duration,
    pub clear_delay: Duration,
    pub notification_duration: Duration,
    pub restart_policy: RestartPolicy,
    pub speech: SpeechConfig,
}

impl KioskSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inactivity: config.inactivity_timeout(),
            clear_delay: config.message_clear_delay(),
            notification_duration: config.notification_duration(),
            restart_policy: config.restart_policy(),
            speech: config.speech().clone(),
        }
    }
}

type Settled = (InFlight, Result<VerifyResponse, VerifyError>);

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub struct Kiosk {
    processor: ScanProcessor,
    settings: KioskSettings,
    verifier: Arc<dyn Verifier>,
    scanner: Box<dyn ScannerSource>,
    announcer: Option<Arc<dyn Announcer>>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
    view: KioskView,
    view_tx: watch::Sender<KioskView>,
    message_seq: u64,
    inactivity_deadline: Option<Instant>,
    clear_deadline: Option<Instant>,
    /// Reopen the scanner when the pending announcement finishes
    reopen_pending: bool,
    settle_tx: mpsc::Sender<Settled>,
    settle_rx: mpsc::Receiver<Settled>,
    speech_tx: mpsc::UnboundedSender<u64>,
    speech_rx: mpsc::UnboundedReceiver<u64>,
}

impl Kiosk {
    pub fn new(
        config: &Config,
        verifier: Arc<dyn Verifier>,
        scanner: Box<dyn ScannerSource>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let processor = ScanProcessor::new(config.fallback_list(), config.messages().clone());
        let (view_tx, _) = watch::channel(KioskView::default());
        // One slot is enough: the processor never lets two requests overlap
        let (settle_tx, settle_rx) = mpsc::channel(1);
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();

        Self {
            processor,
            settings: KioskSettings::from_config(config),
            verifier,
            scanner,
            announcer: None,
            notifier: Arc::new(LogNotifier),
            metrics,
            view: KioskView::default(),
            view_tx,
            message_seq: 0,
            inactivity_deadline: None,
            clear_deadline: None,
            reopen_pending: false,
            settle_tx,
            settle_rx,
            speech_tx,
            speech_rx,
        }
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.announcer = Some(announcer);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Subscribe to screen updates
    pub fn subscribe(&self) -> watch::Receiver<KioskView> {
        self.view_tx.subscribe()
    }

    /// Run until `Shutdown` or until the command channel closes
    pub async fn run(mut self, mut commands: mpsc::Receiver<KioskCommand>) {
        info!(
            inactivity_secs = %self.settings.inactivity.as_secs(),
            restart_policy = %self.settings.restart_policy.as_str(),
            speech = %self.announcer.is_some(),
            "kiosk_started"
        );

        loop {
            let scanner_open = self.view.scanner_open;
            let inactivity = self.inactivity_deadline;
            let clear = self.clear_deadline;

            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(KioskCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some((ticket, result)) = self.settle_rx.recv() => self.on_settled(ticket, result),
                Some(seq) = self.speech_rx.recv() => self.on_speech_done(seq),
                decoded = self.scanner.next_decoded(), if scanner_open => match decoded {
                    Some(raw) => self.on_decoded(&raw),
                    None => {
                        warn!("scanner_source_ended");
                        self.close_scanner();
                        self.publish();
                    }
                },
                _ = sleep_until_opt(inactivity), if inactivity.is_some() => self.on_inactivity(),
                _ = sleep_until_opt(clear), if clear.is_some() => self.on_clear_due(),
            }
        }

        info!(in_flight = %self.processor.is_processing(), "kiosk_stopped");
    }

    fn handle_command(&mut self, cmd: KioskCommand) {
        debug!(command = ?cmd, "kiosk_command");
        match cmd {
            KioskCommand::OpenScanner => {
                self.reopen_pending = false;
                self.open_scanner();
            }
            KioskCommand::CloseScanner => {
                self.reopen_pending = false;
                if self.view.scanner_open {
                    self.close_scanner();
                    info!("scanner_closed_manually");
                }
            }
            KioskCommand::DismissMessage => {
                self.view.message = None;
                self.clear_deadline = None;
            }
            KioskCommand::Shutdown => {}
        }
        self.publish();
    }

    fn on_decoded(&mut self, raw: &str) {
        match self.processor.admit(raw) {
            Admission::Ignored => self.metrics.record_scan_ignored(),
            Admission::Blank => {}
            Admission::Started { ticket, message } => {
                self.metrics.record_scan_admitted();
                self.view.processing = true;
                self.view.last_barcode = Some(ticket.barcode().to_string());
                self.show_message(MessageKind::Processing, message);

                let verifier = self.verifier.clone();
                let settle_tx = self.settle_tx.clone();
                tokio::spawn(async move {
                    debug!(scan_id = %ticket.scan_id(), "verify_dispatched");
                    let result = verifier.verify(ticket.barcode()).await;
                    let _ = settle_tx.send((ticket, result)).await;
                });
                self.publish();
            }
        }
    }

    fn on_settled(&mut self, ticket: InFlight, result: Result<VerifyResponse, VerifyError>) {
        let outcome = self.processor.settle(ticket, result, Local::now());
        self.metrics.record_settled(outcome.resolution, outcome.latency_ms);
        self.view.processing = false;
        let seq = self.show_message(outcome.kind, outcome.message.clone());

        let mut announced = false;
        if let (Some(text), Some(announcer)) = (&outcome.announcement, &self.announcer) {
            if announcer.is_speaking() {
                debug!(scan_id = %outcome.scan_id, "announcement_skipped_busy");
            } else {
                let done = announcer.speak(Utterance::new(text.clone(), &self.settings.speech));
                let speech_tx = self.speech_tx.clone();
                tokio::spawn(async move {
                    let _ = done.await;
                    let _ = speech_tx.send(seq);
                });
                announced = true;
            }
        }

        if let Some(ref notification) = outcome.notification {
            self.notifier.notify(notification, self.settings.notification_duration);
        }

        self.apply_restart_policy(announced);
        self.publish();
    }

    /// Scanner visibility after a settled scan
    fn apply_restart_policy(&mut self, announced: bool) {
        // Closed by the timer or the operator while in flight: leave it closed
        if !self.view.scanner_open {
            return;
        }
        match self.settings.restart_policy {
            RestartPolicy::Manual => self.close_scanner(),
            RestartPolicy::KeepOpen => self.arm_inactivity(),
            RestartPolicy::ReopenAfterAnnouncement => {
                if announced {
                    self.close_scanner();
                    self.reopen_pending = true;
                } else {
                    self.open_scanner();
                }
            }
        }
    }

    fn on_speech_done(&mut self, seq: u64) {
        if self.view.message.as_ref().map(|m| m.seq) == Some(seq) {
            self.clear_deadline = Some(Instant::now() + self.settings.clear_delay);
        }
        if self.reopen_pending {
            self.reopen_pending = false;
            self.open_scanner();
            self.publish();
        }
    }

    fn on_inactivity(&mut self) {
        self.inactivity_deadline = None;
        self.reopen_pending = false;
        if !self.view.scanner_open {
            return;
        }
        self.close_scanner();
        self.metrics.record_inactivity_close();
        info!(timeout_secs = %self.settings.inactivity.as_secs(), "scanner_closed_inactivity");
        let text = self.processor.messages().inactivity.clone();
        self.show_message(MessageKind::Inactivity, text);
        self.publish();
    }

    fn on_clear_due(&mut self) {
        self.clear_deadline = None;
        if self.view.message.take().is_some() {
            debug!("status_message_auto_cleared");
            self.publish();
        }
    }

    fn open_scanner(&mut self) {
        self.scanner.restart();
        self.view.scanner_open = true;
        self.arm_inactivity();
        info!("scanner_opened");
    }

    fn close_scanner(&mut self) {
        self.view.scanner_open = false;
        self.inactivity_deadline = None;
    }

    fn arm_inactivity(&mut self) {
        self.inactivity_deadline = Some(Instant::now() + self.settings.inactivity);
    }

    /// Replace the visible message, cancelling any pending auto-clear
    fn show_message(&mut self, kind: MessageKind, text: String) -> u64 {
        self.message_seq += 1;
        self.clear_deadline = None;
        debug!(seq = %self.message_seq, kind = %kind.as_str(), "status_message_shown");
        self.view.message = Some(StatusMessage { seq: self.message_seq, kind, text });
        self.message_seq
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view.clone());
    }
}
