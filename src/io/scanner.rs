//! Scanner sources - decoded barcode input for the kiosk
//!
//! A `ScannerSource` is a lazy, restartable sequence of decoded barcodes.
//! The kiosk only polls it while the scanning UI is open, and calls
//! `restart()` on every open so input decoded while closed is dropped.
//!
//! USB/HID barcode scanners behave like keyboards: each scan arrives as a
//! line on stdin. `run_console_router` splits such a console into decoded
//! barcodes and operator commands.

use crate::services::kiosk::KioskCommand;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[async_trait]
pub trait ScannerSource: Send {
    /// Next decoded barcode, `None` once the source is exhausted
    ///
    /// Must be cancel-safe: the kiosk drops this future whenever another
    /// event wins the select.
    async fn next_decoded(&mut self) -> Option<String>;

    /// Discard anything buffered before the scanner was (re)opened
    fn restart(&mut self);
}

/// Scanner fed through an mpsc channel
pub struct ChannelScanner {
    rx: mpsc::Receiver<String>,
}

/// Create a channel scanner and the sender that feeds it
pub fn channel_scanner(buffer: usize) -> (mpsc::Sender<String>, ChannelScanner) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, ChannelScanner { rx })
}

#[async_trait]
impl ScannerSource for ChannelScanner {
    async fn next_decoded(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    fn restart(&mut self) {
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped = %dropped, "scanner_stale_input_dropped");
        }
    }
}

/// One console line, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(KioskCommand),
    Decoded(String),
    Unknown(String),
    Blank,
}

/// Classify a console line. Lines starting with `/` are operator commands.
pub fn parse_console_line(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Blank;
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return ConsoleInput::Decoded(line.to_string());
    };
    match command.to_ascii_lowercase().as_str() {
        "open" | "scan" => ConsoleInput::Command(KioskCommand::OpenScanner),
        "close" => ConsoleInput::Command(KioskCommand::CloseScanner),
        "dismiss" | "ok" => ConsoleInput::Command(KioskCommand::DismissMessage),
        "quit" | "exit" => ConsoleInput::Command(KioskCommand::Shutdown),
        _ => ConsoleInput::Unknown(trimmed.to_string()),
    }
}

/// Route console lines until EOF, then request shutdown
pub async fn run_console_router<R>(
    reader: R,
    scan_tx: mpsc::Sender<String>,
    cmd_tx: mpsc::Sender<KioskCommand>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    info!("console_router_started");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "console_read_error");
                break;
            }
        };

        match parse_console_line(&line) {
            ConsoleInput::Command(cmd) => {
                if cmd_tx.send(cmd).await.is_err() {
                    return;
                }
            }
            ConsoleInput::Decoded(raw) => {
                // A full buffer means the kiosk is not draining: drop like a camera would
                if scan_tx.try_send(raw).is_err() {
                    debug!("console_scan_dropped");
                }
            }
            ConsoleInput::Unknown(cmd) => warn!(command = %cmd, "console_unknown_command"),
            ConsoleInput::Blank => {}
        }
    }

    info!("console_router_eof");
    let _ = cmd_tx.send(KioskCommand::Shutdown).await;
}
