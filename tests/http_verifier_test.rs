//! HTTP verifier and guest directory against an in-process server

use bytes::Bytes;
use guest_kiosk::domain::types::{Barcode, GuestStatus, VerifyResponse};
use guest_kiosk::io::{GuestDirectory, HttpGuestDirectory, HttpVerifier, Verifier, VerifyError};
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Default)]
struct Seen {
    bodies: Mutex<Vec<String>>,
    auth: Mutex<Vec<Option<String>>>,
}

fn reply(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

async fn handle(
    req: Request<hyper::body::Incoming>,
    seen: Arc<Seen>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let auth = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    seen.auth.lock().push(auth);

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = req.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body).to_string();
    seen.bodies.lock().push(body.clone());

    let response = match (method, path.as_str()) {
        (Method::POST, "/api/verify") => {
            if body.contains("555") {
                reply(StatusCode::OK, r#"{"status":"found","name":"Jane Doe"}"#)
            } else if body.contains("500") {
                reply(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"boom"}"#)
            } else if body.contains("garbage") {
                reply(StatusCode::OK, "<html>not json</html>")
            } else if body.contains("nameless") {
                reply(StatusCode::OK, r#"{"status":"found"}"#)
            } else {
                reply(StatusCode::OK, r#"{"status":"not_found"}"#)
            }
        }
        (Method::GET, "/api/check-in") => reply(
            StatusCode::OK,
            r#"{"guests":[
                {"id":"a","serialNumber":2,"barcode":"555","name":"Jane Doe","organization":null,"status":"Arrived","arrivalTime":"2026-10-14 09:30:00"},
                {"id":"b","serialNumber":"1","barcode":"777","name":"John Smith","organization":"Globex","status":"Pending"}
            ]}"#,
        ),
        (Method::GET, "/api/empty") => reply(StatusCode::OK, "{}"),
        _ => reply(StatusCode::NOT_FOUND, "{}"),
    };
    Ok(response)
}

async fn start_server() -> (SocketAddr, Arc<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Seen::default());

    let server_seen = seen.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let seen = server_seen.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| handle(req, seen.clone()));
                let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
            });
        }
    });

    (addr, seen)
}

fn verifier(addr: SocketAddr) -> HttpVerifier {
    HttpVerifier::new(&format!("http://{}/api/verify", addr), Duration::from_secs(2)).unwrap()
}

fn barcode(raw: &str) -> Barcode {
    Barcode::parse(raw).unwrap()
}

#[tokio::test]
async fn test_found_response() {
    let (addr, seen) = start_server().await;
    let result = verifier(addr).verify(&barcode("555")).await.unwrap();
    assert_eq!(result, VerifyResponse::Found { name: "Jane Doe".to_string() });

    let bodies = seen.bodies.lock().clone();
    let sent: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(sent, serde_json::json!({ "barcode": "555" }));
}

#[tokio::test]
async fn test_other_status_is_not_found() {
    let (addr, _) = start_server().await;
    let result = verifier(addr).verify(&barcode("0000")).await.unwrap();
    assert_eq!(result, VerifyResponse::NotFound);
}

#[tokio::test]
async fn test_non_success_status_is_service_error() {
    let (addr, _) = start_server().await;
    let err = verifier(addr).verify(&barcode("500")).await.unwrap_err();
    assert!(matches!(err, VerifyError::Service(ref m) if m.contains("500")));
}

#[tokio::test]
async fn test_malformed_body_is_service_error() {
    let (addr, _) = start_server().await;
    let v = verifier(addr);
    assert!(matches!(v.verify(&barcode("garbage")).await, Err(VerifyError::Service(_))));
    assert!(matches!(v.verify(&barcode("nameless")).await, Err(VerifyError::Service(_))));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = verifier(addr).verify(&barcode("555")).await.unwrap_err();
    assert!(matches!(err, VerifyError::Network(_)));
}

#[tokio::test]
async fn test_url_credentials_sent_as_basic_auth() {
    let (addr, seen) = start_server().await;
    let v = HttpVerifier::new(&format!("http://admin:123@{}/api/verify", addr), Duration::from_secs(2))
        .unwrap();
    assert_eq!(v.url(), format!("http://{}/api/verify", addr));

    v.verify(&barcode("555")).await.unwrap();
    let auth = seen.auth.lock().clone();
    assert_eq!(auth, vec![Some("Basic YWRtaW46MTIz".to_string())]);
}

#[tokio::test]
async fn test_directory_fetch_normalizes_records() {
    let (addr, _) = start_server().await;
    let directory =
        HttpGuestDirectory::new(&format!("http://{}/api/check-in", addr), Duration::from_secs(2))
            .unwrap();
    let guests = directory.fetch_guests().await.unwrap();

    assert_eq!(guests.len(), 2);
    assert_eq!(guests[0].serial_number.numeric(), Some(2));
    assert_eq!(guests[0].organization, "N/A");
    assert_eq!(guests[0].status, GuestStatus::Arrived);
    assert_eq!(guests[1].serial_number.numeric(), Some(1));
    assert_eq!(guests[1].status, GuestStatus::Pending);
    assert_eq!(guests[1].arrival_time, "");
}

#[tokio::test]
async fn test_directory_without_guests_is_empty() {
    let (addr, _) = start_server().await;
    let directory =
        HttpGuestDirectory::new(&format!("http://{}/api/empty", addr), Duration::from_secs(2))
            .unwrap();
    assert!(directory.fetch_guests().await.unwrap().is_empty());
}
