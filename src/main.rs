//! Guest check-in kiosk
//!
//! Reads decoded barcodes from a keyboard-wedge scanner on stdin, verifies
//! them against the check-in API and shows the outcome on the terminal.
//!
//! Module structure:
//! - `domain/` - Core types (Barcode, GuestRecord, StatusMessage)
//! - `io/` - External interfaces (verification API, scanner, speech, report)
//! - `services/` - Scan processor and the kiosk event loop
//! - `infra/` - Infrastructure (Config, Metrics, logging)
//!
//! Console commands: `/open`, `/close`, `/dismiss`, `/quit`. Any other line
//! is treated as a decoded barcode.

use clap::Parser;
use guest_kiosk::infra::config::DEFAULT_CONFIG_PATH;
use guest_kiosk::infra::{logging, Config, Metrics};
use guest_kiosk::io::{channel_scanner, run_console_router, CommandAnnouncer, HttpVerifier};
use guest_kiosk::services::{Kiosk, KioskCommand, KioskView};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Guest check-in kiosk
#[derive(Parser, Debug)]
#[command(name = "checkin-kiosk", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Open the scanner at startup
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_stderr();

    let args = Args::parse();
    info!(git_hash = %env!("GIT_HASH"), "checkin-kiosk starting");

    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        kiosk_id = %config.kiosk_id(),
        verify_url = %config.verify_url(),
        verify_timeout_ms = %config.verify_timeout().as_millis(),
        inactivity_secs = %config.inactivity_timeout().as_secs(),
        restart_policy = %config.restart_policy().as_str(),
        speech_enabled = %config.speech().enabled,
        fallback_entries = %config.fallback_list().len(),
        "config_loaded"
    );

    let verifier = Arc::new(HttpVerifier::from_config(&config)?);
    let metrics = Arc::new(Metrics::new());

    // Scanner input and operator commands share stdin
    let (scan_tx, scanner) = channel_scanner(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(32);

    let router_cmd_tx = cmd_tx.clone();
    tokio::spawn(async move {
        run_console_router(BufReader::new(tokio::io::stdin()), scan_tx, router_cmd_tx).await;
    });

    let mut kiosk = Kiosk::new(&config, verifier, Box::new(scanner), metrics.clone());
    if config.speech().enabled {
        kiosk = kiosk.with_announcer(Arc::new(CommandAnnouncer::new(config.speech().command.clone())));
    }

    let view_rx = kiosk.subscribe();
    tokio::spawn(render_screen(view_rx));

    // Periodic metrics summary
    let metrics_interval = config.metrics_interval_secs();
    if metrics_interval > 0 {
        let metrics_clone = metrics.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
            // First tick fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                metrics_clone.report().log();
            }
        });
    }

    // Handle shutdown on Ctrl+C
    let shutdown_tx = cmd_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(KioskCommand::Shutdown).await;
    });

    if args.open {
        cmd_tx.send(KioskCommand::OpenScanner).await?;
    }
    drop(cmd_tx);

    // Runs until /quit, stdin EOF or Ctrl+C
    kiosk.run(cmd_rx).await;

    metrics.report().log();
    info!("checkin-kiosk shutdown complete");
    Ok(())
}

/// Print the kiosk screen whenever it changes
async fn render_screen(mut view_rx: watch::Receiver<KioskView>) {
    let mut last = KioskView::default();
    while view_rx.changed().await.is_ok() {
        let view = view_rx.borrow_and_update().clone();
        for line in screen_lines(&last, &view) {
            println!("{}", line);
        }
        last = view;
    }
}

/// Lines to print for the transition from `last` to `view`
fn screen_lines(last: &KioskView, view: &KioskView) -> Vec<String> {
    let mut lines = Vec::new();
    if view.scanner_open != last.scanner_open {
        lines.push(format!("[scanner {}]", if view.scanner_open { "open" } else { "closed" }));
    }
    if view.last_barcode != last.last_barcode {
        if let Some(ref barcode) = view.last_barcode {
            lines.push(format!("Scanned Barcode: {}", barcode));
        }
    }
    if view.message != last.message {
        match &view.message {
            Some(message) => lines.push(message.text.clone()),
            None => lines.push(String::new()),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use guest_kiosk::domain::types::{MessageKind, StatusMessage};

    #[test]
    fn test_config_path_flag() {
        let args = Args::try_parse_from(["checkin-kiosk", "--config", "config/lobby.toml"]).unwrap();
        assert_eq!(args.config, "config/lobby.toml");

        let args = Args::try_parse_from(["checkin-kiosk", "-c", "hall.toml", "--open"]).unwrap();
        assert_eq!(args.config, "hall.toml");
        assert!(args.open);
    }

    #[test]
    fn test_screen_shows_scanned_barcode_and_message() {
        let last = KioskView { scanner_open: true, ..Default::default() };
        let view = KioskView {
            scanner_open: true,
            processing: true,
            message: Some(StatusMessage {
                seq: 1,
                kind: MessageKind::Processing,
                text: "Processing...".to_string(),
            }),
            last_barcode: Some("1234567890".to_string()),
        };

        assert_eq!(
            screen_lines(&last, &view),
            vec!["Scanned Barcode: 1234567890".to_string(), "Processing...".to_string()]
        );
        // Nothing changed, nothing printed
        assert!(screen_lines(&view, &view).is_empty());
    }
}
