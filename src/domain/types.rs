//! Shared types for the check-in kiosk

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Decoded barcode, trimmed of surrounding whitespace
///
/// Construction goes through [`Barcode::parse`], so a `Barcode` is never
/// empty and never carries leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Barcode(String);

impl Barcode {
    /// Trim a raw decoder string. Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation id for one verification round-trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ScanId(pub Uuid);

impl ScanId {
    /// Time-ordered id for a newly admitted scan
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a well-formed verification response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResponse {
    Found { name: String },
    NotFound,
}

/// Raw verification body: `{"status": "found", "name": "..."}` or any other status
#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    pub status: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl VerifyBody {
    /// Interpret the body. `found` without a usable name is malformed.
    pub fn into_response(self) -> Result<VerifyResponse, String> {
        if self.status != "found" {
            return Ok(VerifyResponse::NotFound);
        }
        match self.name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => Ok(VerifyResponse::Found { name }),
            _ => Err("found response without guest name".to_string()),
        }
    }
}

/// One entry of the static fallback allow-list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FallbackEntry {
    pub barcode: String,
    pub name: String,
}

/// Ordered allow-list consulted only when the remote service reports not found
#[derive(Debug, Clone, Default)]
pub struct FallbackList {
    entries: Vec<FallbackEntry>,
}

impl FallbackList {
    /// Entries are trimmed on construction; blank barcodes are dropped.
    pub fn new(entries: Vec<FallbackEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|e| {
                let barcode = e.barcode.trim().to_string();
                if barcode.is_empty() {
                    return None;
                }
                Some(FallbackEntry { barcode, name: e.name.trim().to_string() })
            })
            .collect();
        Self { entries }
    }

    /// First entry whose barcode matches exactly (case-sensitive)
    pub fn lookup(&self, barcode: &Barcode) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.barcode == barcode.as_str())
            .map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Arrival state of a guest
///
/// The directory is lenient: status strings match case-insensitively and
/// anything unrecognised is read as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GuestStatus {
    #[default]
    Pending,
    Arrived,
}

impl GuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestStatus::Pending => "Pending",
            GuestStatus::Arrived => "Arrived",
        }
    }
}

impl<'de> Deserialize<'de> for GuestStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let status = raw.trim();
        if status.eq_ignore_ascii_case("arrived") {
            Ok(GuestStatus::Arrived)
        } else if status.is_empty() || status.eq_ignore_ascii_case("pending") {
            Ok(GuestStatus::Pending)
        } else {
            warn!(status = %status, "guest_status_unknown_using_pending");
            Ok(GuestStatus::Pending)
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serial number as listed by the guest directory
///
/// The hosted API sends either a string or an integer. Sorting uses the
/// numeric value when one can be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct SerialNumber(pub String);

impl SerialNumber {
    /// Leading-integer parse, like the dashboard's `parseInt`
    pub fn numeric(&self) -> Option<i64> {
        let s = self.0.trim();
        let end = s
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        s[..end].parse().ok()
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn deserialize_serial<'de, D>(deserializer: D) -> Result<SerialNumber, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct SerialVisitor;

    impl<'de> Visitor<'de> for SerialVisitor {
        type Value = SerialNumber;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or number serial number")
        }

        fn visit_str<E>(self, value: &str) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            // 2.0 lists as "2"
            if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
                Ok(SerialNumber((value as i64).to_string()))
            } else {
                Ok(SerialNumber(value.to_string()))
            }
        }

        fn visit_bool<E>(self, value: bool) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber(value.to_string()))
        }

        fn visit_unit<E>(self) -> Result<SerialNumber, E>
        where
            E: de::Error,
        {
            Ok(SerialNumber::default())
        }
    }

    deserializer.deserialize_any(SerialVisitor)
}

fn default_organization() -> String {
    "N/A".to_string()
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_organization<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|o| !o.is_empty())
        .unwrap_or_else(default_organization))
}

/// Guest as owned by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
    #[serde(default, deserialize_with = "deserialize_serial")]
    pub id: SerialNumber,
    #[serde(default, deserialize_with = "deserialize_serial")]
    pub serial_number: SerialNumber,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub barcode: String,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub name: String,
    #[serde(default = "default_organization", deserialize_with = "deserialize_organization")]
    pub organization: String,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub status: GuestStatus,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub arrival_time: String,
}

/// Which message the kiosk is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Processing,
    Welcome,
    NotRecognized,
    Retry,
    Inactivity,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Processing => "processing",
            MessageKind::Welcome => "welcome",
            MessageKind::NotRecognized => "not_recognized",
            MessageKind::Retry => "retry",
            MessageKind::Inactivity => "inactivity",
        }
    }
}

/// The single visible status message
///
/// `seq` increases with every message shown, so a late announcement
/// completion can tell whether its message is still the visible one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub seq: u64,
    pub kind: MessageKind,
    pub text: String,
}

/// Transient check-in notification (toast)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub name: String,
    pub checked_in_at: DateTime<Local>,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barcode_trims_and_rejects_blank() {
        assert_eq!(Barcode::parse(" 1234567890 \n").unwrap().as_str(), "1234567890");
        assert!(Barcode::parse("   ").is_none());
        assert!(Barcode::parse("").is_none());
    }

    #[test]
    fn test_fallback_lookup_exact_and_case_sensitive() {
        let list = FallbackList::new(vec![
            FallbackEntry { barcode: " ABC123 ".to_string(), name: "Guest A".to_string() },
            FallbackEntry { barcode: "".to_string(), name: "Blank".to_string() },
        ]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.lookup(&Barcode::parse("ABC123").unwrap()), Some("Guest A"));
        assert_eq!(list.lookup(&Barcode::parse("abc123").unwrap()), None);
        assert_eq!(list.lookup(&Barcode::parse("ABC12").unwrap()), None);
    }

    #[test]
    fn test_verify_body_interpretation() {
        let found: VerifyBody = serde_json::from_str(r#"{"status":"found","name":"Jane Doe"}"#).unwrap();
        assert_eq!(found.into_response(), Ok(VerifyResponse::Found { name: "Jane Doe".to_string() }));

        let other: VerifyBody = serde_json::from_str(r#"{"status":"already_checked_in"}"#).unwrap();
        assert_eq!(other.into_response(), Ok(VerifyResponse::NotFound));

        let nameless: VerifyBody = serde_json::from_str(r#"{"status":"found"}"#).unwrap();
        assert!(nameless.into_response().is_err());
    }

    #[test]
    fn test_guest_record_defaults_and_mixed_serials() {
        let json = r#"[
            {"id": "a1", "serialNumber": 7, "barcode": "111", "name": "Ann"},
            {"id": 2, "serialNumber": "12", "barcode": "222", "name": "Bob",
             "organization": "Acme", "status": "Arrived", "arrivalTime": "10:02"},
            {"id": "c3", "serialNumber": null, "barcode": "333", "name": "Cy",
             "organization": null, "status": null}
        ]"#;
        let guests: Vec<GuestRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(guests[0].serial_number.numeric(), Some(7));
        assert_eq!(guests[0].organization, "N/A");
        assert_eq!(guests[0].status, GuestStatus::Pending);
        assert_eq!(guests[0].arrival_time, "");

        assert_eq!(guests[1].id.0, "2");
        assert_eq!(guests[1].serial_number.numeric(), Some(12));
        assert_eq!(guests[1].status, GuestStatus::Arrived);

        assert_eq!(guests[2].serial_number.numeric(), None);
        assert_eq!(guests[2].organization, "N/A");
        assert_eq!(guests[2].status, GuestStatus::Pending);
    }

    #[test]
    fn test_status_and_serial_are_lenient() {
        let json = r#"[
            {"serialNumber": 2.0, "name": "Float", "status": "arrived"},
            {"serialNumber": 3.5, "name": "Fraction", "status": " PENDING "},
            {"serialNumber": true, "name": "Bool", "status": "checked-in"}
        ]"#;
        let guests: Vec<GuestRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(guests[0].serial_number.0, "2");
        assert_eq!(guests[0].status, GuestStatus::Arrived);
        assert_eq!(guests[1].serial_number.numeric(), Some(3));
        assert_eq!(guests[1].status, GuestStatus::Pending);
        assert_eq!(guests[2].serial_number.numeric(), None);
        assert_eq!(guests[2].status, GuestStatus::Pending);
    }

    #[test]
    fn test_scan_ids_are_unique() {
        assert_ne!(ScanId::generate(), ScanId::generate());
        assert_eq!(MessageKind::Inactivity.as_str(), "inactivity");
    }

    #[test]
    fn test_serial_numeric_leading_digits() {
        assert_eq!(SerialNumber("42abc".to_string()).numeric(), Some(42));
        assert_eq!(SerialNumber(" 9 ".to_string()).numeric(), Some(9));
        assert_eq!(SerialNumber("abc".to_string()).numeric(), None);
    }
}
