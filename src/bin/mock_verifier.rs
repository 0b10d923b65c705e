//! Mock check-in API
//!
//! Emulates the hosted guest service for local runs of the kiosk and the
//! dashboard.
//!
//! Endpoints:
//! - `POST /api/verify` `{"barcode": "..."}` -> `{"status":"found","name":...}`
//!   and marks the guest Arrived, or `{"status":"not_found"}`
//! - `GET /api/check-in` -> `{"guests": [...]}`
//! - `GET /health` -> `ok`
//!
//! Usage:
//!   cargo run --bin mock-verifier -- --port 8080 --guests guests.json

use bytes::Bytes;
use clap::Parser;
use guest_kiosk::domain::types::{GuestRecord, GuestStatus, SerialNumber};
use guest_kiosk::infra::logging;
use guest_kiosk::io::directory::parse_guest_list;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "mock-verifier")]
#[command(about = "Mock guest check-in API for local simulation")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// JSON file with `{"guests": [...]}` (built-in sample when omitted)
    #[arg(short, long)]
    guests: Option<String>,

    /// Artificial latency per verification (ms)
    #[arg(long, default_value = "300")]
    latency_ms: u64,

    /// Answer every Nth verification with HTTP 500 (0 = never)
    #[arg(long, default_value = "0")]
    fail_every: u64,
}

#[derive(Deserialize)]
struct VerifyRequest {
    barcode: String,
}

struct GuestStore {
    guests: Mutex<Vec<GuestRecord>>,
    requests: AtomicU64,
    latency: Duration,
    fail_every: u64,
}

impl GuestStore {
    /// Mark the matching guest Arrived and return their name
    fn check_in(&self, barcode: &str) -> Option<String> {
        let mut guests = self.guests.lock();
        let guest = guests.iter_mut().find(|g| g.barcode.trim() == barcode)?;
        if guest.status != GuestStatus::Arrived {
            guest.status = GuestStatus::Arrived;
            guest.arrival_time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        }
        Some(guest.name.clone())
    }

    fn should_fail(&self) -> bool {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.fail_every > 0 && n % self.fail_every == 0
    }
}

fn sample_guests() -> Vec<GuestRecord> {
    [
        ("1", "1234567890", "Mr Suvarnanidhi Rao", "N/A"),
        ("2", "5550001111", "Jane Doe", "Acme Corp"),
        ("3", "5550002222", "John Smith", "Globex"),
        ("10", "5550003333", "Ann Lee", "Initech"),
    ]
    .into_iter()
    .map(|(serial, barcode, name, organization)| GuestRecord {
        id: SerialNumber(format!("g{}", serial)),
        serial_number: SerialNumber(serial.to_string()),
        barcode: barcode.to_string(),
        name: name.to_string(),
        organization: organization.to_string(),
        status: GuestStatus::Pending,
        arrival_time: String::new(),
    })
    .collect()
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    store: Arc<GuestStore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/api/verify") => {
            let body = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, "verify_body_read_failed");
                    return Ok(json_response(StatusCode::BAD_REQUEST, r#"{"error":"bad_body"}"#.into()));
                }
            };
            let request: VerifyRequest = match serde_json::from_slice(&body) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "verify_body_invalid");
                    return Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        r#"{"error":"invalid_json"}"#.into(),
                    ));
                }
            };

            tokio::time::sleep(store.latency).await;

            if store.should_fail() {
                warn!(barcode = %request.barcode, "verify_injected_failure");
                return Ok(json_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    r#"{"error":"injected_failure"}"#.into(),
                ));
            }

            let barcode = request.barcode.trim();
            let body = match store.check_in(barcode) {
                Some(name) => {
                    info!(barcode = %barcode, name = %name, "guest_checked_in");
                    serde_json::json!({ "status": "found", "name": name })
                }
                None => {
                    info!(barcode = %barcode, "guest_not_found");
                    serde_json::json!({ "status": "not_found" })
                }
            };
            Ok(json_response(StatusCode::OK, body.to_string()))
        }
        (&Method::GET, "/api/check-in") => {
            let guests = store.guests.lock().clone();
            let body = serde_json::json!({ "guests": guests });
            Ok(json_response(StatusCode::OK, body.to_string()))
        }
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_stderr();
    let args = Args::parse();

    let guests = match &args.guests {
        Some(path) => {
            let body = std::fs::read(path)?;
            parse_guest_list(&body)?
        }
        None => sample_guests(),
    };

    let store = Arc::new(GuestStore {
        guests: Mutex::new(guests),
        requests: AtomicU64::new(0),
        latency: Duration::from_millis(args.latency_ms),
        fail_every: args.fail_every,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        port = %args.port,
        guests = %store.guests.lock().len(),
        latency_ms = %args.latency_ms,
        fail_every = %args.fail_every,
        "mock_verifier_started"
    );

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let store = store.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let store = store.clone();
                                async move { handle_request(req, store).await }
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                                error!(error = %e, "mock_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_accept_error");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("mock_verifier_shutdown");
                return Ok(());
            }
        }
    }
}
