//! Sorting, filtering and CSV shaping for the admin attendance list.
//!
//! Everything here is a pure function of its inputs. The CSV rows follow the
//! order of the slice they are given, so callers filter and sort first.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::attendance::AttendanceRecord;
use crate::utils::client_ip::UNKNOWN_IP;

pub const MISSING_IP: &str = "N/A";
pub const MISSING_ANSWER: &str = "__";

pub const CSV_HEADERS: [&str; 6] = [
    "#",
    "Roll Number",
    "Name",
    "Submission Time",
    "IP Address",
    "Answer",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[strum(serialize = "rollNumber")]
    RollNumber,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "timestamp")]
    Timestamp,
    #[strum(serialize = "ipAddress")]
    IpAddress,
    #[strum(serialize = "optionalField")]
    OptionalField,
    #[strum(serialize = "attendanceDate")]
    AttendanceDate,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Column the dashboard is currently sorted by, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortState {
    /// Clicking the active column flips the direction; any other column
    /// starts ascending.
    pub fn select(self, key: SortKey) -> Self {
        if self.key == Some(key) {
            SortState {
                key: self.key,
                direction: self.direction.flipped(),
            }
        } else {
            SortState {
                key: Some(key),
                direction: SortDirection::Asc,
            }
        }
    }

    pub fn apply(&self, records: &[AttendanceRecord]) -> Vec<AttendanceRecord> {
        match self.key {
            Some(key) => sort(records, key, self.direction),
            None => records.to_vec(),
        }
    }
}

fn compare(a: &AttendanceRecord, b: &AttendanceRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::RollNumber => a.roll_number.cmp(&b.roll_number),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Timestamp => a.timestamp.cmp(&b.timestamp),
        SortKey::IpAddress => a.ip_address.cmp(&b.ip_address),
        // Missing answers sort before any answer
        SortKey::OptionalField => a.optional_field.cmp(&b.optional_field),
        SortKey::AttendanceDate => a.attendance_date.cmp(&b.attendance_date),
    }
}

/// Stable sort; ties keep their input order in both directions.
pub fn sort(
    records: &[AttendanceRecord],
    key: SortKey,
    direction: SortDirection,
) -> Vec<AttendanceRecord> {
    let mut sorted = records.to_vec();
    match direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare(a, b, key)),
        SortDirection::Desc => sorted.sort_by(|a, b| compare(b, a, key)),
    }
    sorted
}

/// Case-insensitive substring match on roll number, name and answer.
pub fn filter(records: &[AttendanceRecord], query: &str) -> Vec<AttendanceRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| {
            r.roll_number.to_lowercase().contains(&needle)
                || r.name.to_lowercase().contains(&needle)
                || r
                    .optional_field
                    .as_deref()
                    .is_some_and(|f| f.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn csv_row(index: usize, record: &AttendanceRecord) -> Vec<String> {
    vec![
        (index + 1).to_string(),
        record.roll_number.clone(),
        record.name.clone(),
        record.timestamp.clone(),
        if record.ip_address.is_empty() || record.ip_address == UNKNOWN_IP {
            MISSING_IP.to_string()
        } else {
            record.ip_address.clone()
        },
        record
            .optional_field
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(MISSING_ANSWER)
            .to_string(),
    ]
}

/// Header line followed by one line per record, in slice order.
pub fn to_csv<H: AsRef<str>>(records: &[AttendanceRecord], headers: &[H]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| csv_cell(h.as_ref()))
            .collect::<Vec<_>>()
            .join(","),
    );

    for (idx, record) in records.iter().enumerate() {
        lines.push(
            csv_row(idx, record)
                .iter()
                .map(|c| csv_cell(c))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}
