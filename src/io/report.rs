//! Attendance report export
//!
//! Plain-text rendition of the dashboard's "Guest Attendance Report":
//! one table, paginated, header repeated on every page, pages separated
//! by a form feed.

use crate::domain::guests::{AttendanceSummary, StatusFilter};
use crate::domain::types::GuestRecord;
use anyhow::Context;
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use tracing::info;

pub const REPORT_TITLE: &str = "Guest Attendance Report";
const PAGE_BREAK: char = '\u{000C}';

// Column widths: Sr. No., Name, Organization, Status, Arrival Time
const WIDTHS: [usize; 5] = [8, 28, 32, 10, 20];
const HEADERS: [&str; 5] = ["Sr. No.", "Name", "Organization", "Status", "Arrival Time"];

fn cell(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{:<width$}", text, width = width)
    } else {
        let mut truncated: String = text.chars().take(width.saturating_sub(1)).collect();
        truncated.push('~');
        truncated
    }
}

fn row(columns: [&str; 5]) -> String {
    let cells: Vec<String> =
        columns.iter().zip(WIDTHS.iter()).map(|(text, &w)| cell(text, w)).collect();
    cells.join(" ").trim_end().to_string()
}

fn header_lines() -> [String; 2] {
    let rule_len = WIDTHS.iter().sum::<usize>() + WIDTHS.len() - 1;
    [row(HEADERS), "-".repeat(rule_len)]
}

/// Rows in the order they should be printed
pub struct AttendanceReport<'a> {
    pub rows: Vec<&'a GuestRecord>,
    pub filter: StatusFilter,
    pub generated_at: DateTime<Local>,
}

impl<'a> AttendanceReport<'a> {
    pub fn render(&self, rows_per_page: usize) -> String {
        let rows_per_page = rows_per_page.max(1);
        let summary = AttendanceSummary::from_guests(self.rows.iter().copied());

        let mut out = String::new();
        out.push_str(REPORT_TITLE);
        out.push('\n');
        out.push_str(&format!(
            "Generated: {}   Filter: {}   Guests: {}   Arrived: {}   Pending: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S"),
            self.filter.as_str(),
            summary.total,
            summary.arrived,
            summary.pending
        ));

        let [header, rule] = header_lines();
        let pages: Vec<&[&GuestRecord]> = if self.rows.is_empty() {
            vec![self.rows.as_slice()]
        } else {
            self.rows.chunks(rows_per_page).collect()
        };

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                out.push(PAGE_BREAK);
                out.push('\n');
            }
            out.push_str(&header);
            out.push('\n');
            out.push_str(&rule);
            out.push('\n');
            for guest in page.iter() {
                let serial = guest.serial_number.to_string();
                out.push_str(&row([
                    &serial,
                    &guest.name,
                    &guest.organization,
                    guest.status.as_str(),
                    &guest.arrival_time,
                ]));
                out.push('\n');
            }
        }
        out
    }

    /// Render and write to `path`, creating parent directories
    pub fn write_to(&self, path: &Path, rows_per_page: usize) -> anyhow::Result<usize> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let text = self.render(rows_per_page);
        fs::write(path, &text)
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        info!(path = %path.display(), rows = %self.rows.len(), bytes = %text.len(), "report_exported");
        Ok(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{GuestStatus, SerialNumber};
    use chrono::TimeZone;

    fn guest(serial: u32, name: &str, status: GuestStatus) -> GuestRecord {
        GuestRecord {
            id: SerialNumber(format!("g{}", serial)),
            serial_number: SerialNumber(serial.to_string()),
            barcode: format!("{:010}", serial),
            name: name.to_string(),
            organization: "Acme Corp".to_string(),
            status,
            arrival_time: if status == GuestStatus::Arrived {
                "2026-10-14 09:30:00".to_string()
            } else {
                String::new()
            },
        }
    }

    fn generated_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_header_repeats_on_each_page() {
        let guests: Vec<GuestRecord> =
            (1..=5).map(|i| guest(i, &format!("Guest {}", i), GuestStatus::Pending)).collect();
        let report = AttendanceReport {
            rows: guests.iter().collect(),
            filter: StatusFilter::All,
            generated_at: generated_at(),
        };

        let text = report.render(2);
        assert_eq!(text.matches("Sr. No.").count(), 3);
        assert_eq!(text.matches(PAGE_BREAK).count(), 2);
        assert!(text.starts_with(REPORT_TITLE));
        assert!(text.contains("Guests: 5"));
    }

    #[test]
    fn test_row_contents_and_truncation() {
        let mut long = guest(7, "Mr Suvarnanidhi Rao", GuestStatus::Arrived);
        long.organization = "International Association of Very Long Names".to_string();
        let report = AttendanceReport {
            rows: vec![&long],
            filter: StatusFilter::Arrived,
            generated_at: generated_at(),
        };

        let text = report.render(24);
        let line = text.lines().find(|l| l.contains("Suvarnanidhi")).unwrap();
        assert!(line.starts_with("7 "));
        assert!(line.contains("Arrived"));
        assert!(line.contains("2026-10-14 09:30:00"));
        assert!(line.contains("International Association of Ve~"));
        assert!(text.contains("Filter: Arrived"));
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let report =
            AttendanceReport { rows: Vec::new(), filter: StatusFilter::All, generated_at: generated_at() };
        let text = report.render(24);
        assert_eq!(text.matches("Sr. No.").count(), 1);
        assert!(text.contains("Guests: 0"));
    }

    #[test]
    fn test_write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("guest_report.txt");
        let guests = vec![guest(1, "Ann", GuestStatus::Arrived)];
        let report = AttendanceReport {
            rows: guests.iter().collect(),
            filter: StatusFilter::All,
            generated_at: generated_at(),
        };

        assert_eq!(report.write_to(&path, 24).unwrap(), 1);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Ann"));
    }
}
