//! Guest list fetch for the admin dashboard
//!
//! GET {url} returns `{"guests": [...]}`. A body without `guests` is an
//! empty list, like the hosted API answers before any guest is imported.

use crate::domain::types::GuestRecord;
use crate::io::verifier::{basic_auth_header, parse_url_with_auth};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct GuestListBody {
    #[serde(default)]
    guests: Option<Vec<serde_json::Value>>,
}

#[async_trait]
pub trait GuestDirectory: Send + Sync {
    async fn fetch_guests(&self) -> anyhow::Result<Vec<GuestRecord>>;
}

pub struct HttpGuestDirectory {
    url: String,
    auth_header: Option<String>,
    client: reqwest::Client,
}

impl HttpGuestDirectory {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let (url, credentials) = parse_url_with_auth(url);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, auth_header: credentials.map(|(u, p)| basic_auth_header(&u, &p)), client })
    }
}

/// Decode a guest list body
///
/// Rows are decoded one by one; a row that does not decode is skipped
/// with a warning instead of failing the whole list.
pub fn parse_guest_list(body: &[u8]) -> anyhow::Result<Vec<GuestRecord>> {
    let parsed: GuestListBody =
        serde_json::from_slice(body).context("Failed to parse guest list body")?;

    let rows = parsed.guests.unwrap_or_default();
    let mut guests = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<GuestRecord>(row) {
            Ok(guest) => guests.push(guest),
            Err(e) => warn!(row = %index, error = %e, "guest_row_skipped"),
        }
    }
    Ok(guests)
}

#[async_trait]
impl GuestDirectory for HttpGuestDirectory {
    async fn fetch_guests(&self) -> anyhow::Result<Vec<GuestRecord>> {
        let mut request = self.client.get(&self.url).header("Accept", "application/json");
        if let Some(ref auth) = self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach guest directory {}", self.url))?;

        let status = response.status();
        let body = response.bytes().await.context("Failed to read guest list body")?;
        if !status.is_success() {
            anyhow::bail!(
                "Guest directory returned HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            );
        }

        let guests = parse_guest_list(&body)?;
        info!(url = %self.url, guests = %guests.len(), "guest_list_fetched");
        Ok(guests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::GuestStatus;

    #[test]
    fn test_parse_guest_list() {
        let body = br#"{"guests":[{"id":"g1","serialNumber":"1","barcode":"111","name":"Ann"}]}"#;
        let guests = parse_guest_list(body).unwrap();
        assert_eq!(guests.len(), 1);
        assert_eq!(guests[0].name, "Ann");
    }

    #[test]
    fn test_mixed_quality_rows_keep_valid_guests() {
        let body = br#"{"guests":[
            {"id":"g1","serialNumber":1,"barcode":"111","name":"Ann","status":"Arrived"},
            {"id":"g2","serialNumber":2.0,"barcode":"222","name":"Bob","status":"arrived"},
            {"id":"g3","serialNumber":{"n":3},"barcode":"333","name":"Broken"},
            {"id":"g4","serialNumber":"4","barcode":"444","name":"Dee","status":"no-show"}
        ]}"#;
        let guests = parse_guest_list(body).unwrap();

        let names: Vec<&str> = guests.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bob", "Dee"]);
        assert_eq!(guests[1].serial_number.numeric(), Some(2));
        assert_eq!(guests[1].status, GuestStatus::Arrived);
        assert_eq!(guests[2].status, GuestStatus::Pending);
    }

    #[test]
    fn test_missing_guests_is_empty() {
        assert!(parse_guest_list(br#"{}"#).unwrap().is_empty());
        assert!(parse_guest_list(br#"{"guests":null}"#).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_body_is_error() {
        assert!(parse_guest_list(b"<html>502</html>").is_err());
    }
}
