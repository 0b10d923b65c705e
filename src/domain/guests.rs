//! Guest list view for the admin dashboard
//!
//! The dashboard shows a filtered, serial-number-sorted copy of the guest
//! list fetched from the directory. The remote list is never modified.

use crate::domain::types::{GuestRecord, GuestStatus};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Arrived,
    Pending,
}

impl StatusFilter {
    pub fn matches(&self, status: GuestStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Arrived => status == GuestStatus::Arrived,
            StatusFilter::Pending => status == GuestStatus::Pending,
        }
    }

    /// All -> Arrived -> Pending -> All
    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Arrived,
            StatusFilter::Arrived => StatusFilter::Pending,
            StatusFilter::Pending => StatusFilter::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Arrived => "Arrived",
            StatusFilter::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

/// Dashboard filter + sort selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuestQuery {
    pub filter: StatusFilter,
    pub direction: SortDirection,
}

impl GuestQuery {
    /// Apply the query to `guests`, returning borrowed rows in display order
    ///
    /// Serial numbers compare numerically. Rows without a numeric serial
    /// go last in either direction and keep their relative order.
    pub fn apply<'a>(&self, guests: &'a [GuestRecord]) -> Vec<&'a GuestRecord> {
        let mut rows: Vec<&GuestRecord> =
            guests.iter().filter(|g| self.filter.matches(g.status)).collect();

        let direction = self.direction;
        rows.sort_by(|a, b| {
            match (a.serial_number.numeric(), b.serial_number.numeric()) {
                (Some(x), Some(y)) => match direction {
                    SortDirection::Ascending => x.cmp(&y),
                    SortDirection::Descending => y.cmp(&x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        rows
    }
}

/// Arrival counts shown next to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub total: usize,
    pub arrived: usize,
    pub pending: usize,
}

impl AttendanceSummary {
    pub fn from_guests<'a, I>(guests: I) -> Self
    where
        I: IntoIterator<Item = &'a GuestRecord>,
    {
        guests.into_iter().fold(Self::default(), |mut acc, g| {
            acc.total += 1;
            match g.status {
                GuestStatus::Arrived => acc.arrived += 1,
                GuestStatus::Pending => acc.pending += 1,
            }
            acc
        })
    }

    /// Arrived share in percent, 0 for an empty list
    pub fn arrived_percent(&self) -> u16 {
        if self.total == 0 {
            return 0;
        }
        ((self.arrived * 100) / self.total) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SerialNumber;

    fn guest(serial: &str, name: &str, status: GuestStatus) -> GuestRecord {
        GuestRecord {
            id: SerialNumber(serial.to_string()),
            serial_number: SerialNumber(serial.to_string()),
            barcode: format!("bc-{}", serial),
            name: name.to_string(),
            organization: "N/A".to_string(),
            status,
            arrival_time: String::new(),
        }
    }

    fn names(rows: &[&GuestRecord]) -> Vec<String> {
        rows.iter().map(|g| g.name.clone()).collect()
    }

    fn sample() -> Vec<GuestRecord> {
        vec![
            guest("10", "Ten", GuestStatus::Arrived),
            guest("2", "Two", GuestStatus::Pending),
            guest("x", "NoSerial", GuestStatus::Pending),
            guest("1", "One", GuestStatus::Arrived),
        ]
    }

    #[test]
    fn test_sort_is_numeric_not_lexicographic() {
        let guests = sample();
        let rows = GuestQuery::default().apply(&guests);
        assert_eq!(names(&rows), vec!["One", "Two", "Ten", "NoSerial"]);
    }

    #[test]
    fn test_descending_keeps_unparsed_last() {
        let guests = sample();
        let query = GuestQuery { direction: SortDirection::Descending, ..Default::default() };
        assert_eq!(names(&query.apply(&guests)), vec!["Ten", "Two", "One", "NoSerial"]);
    }

    #[test]
    fn test_filter_by_status() {
        let guests = sample();
        let arrived = GuestQuery { filter: StatusFilter::Arrived, ..Default::default() };
        assert_eq!(names(&arrived.apply(&guests)), vec!["One", "Ten"]);

        let pending = GuestQuery { filter: StatusFilter::Pending, ..Default::default() };
        assert_eq!(names(&pending.apply(&guests)), vec!["Two", "NoSerial"]);
    }

    #[test]
    fn test_filter_cycle_and_direction_toggle() {
        assert_eq!(StatusFilter::All.next().next().next(), StatusFilter::All);
        assert_eq!(SortDirection::Ascending.toggle(), SortDirection::Descending);
    }

    #[test]
    fn test_summary_counts() {
        let summary = AttendanceSummary::from_guests(&sample());
        assert_eq!(summary, AttendanceSummary { total: 4, arrived: 2, pending: 2 });
        assert_eq!(summary.arrived_percent(), 50);
        assert_eq!(AttendanceSummary::from_guests(&Vec::new()).arrived_percent(), 0);
    }
}
