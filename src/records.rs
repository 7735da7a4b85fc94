use chrono::NaiveDate;
use tracing::info;

use crate::error::AttendanceError;
use crate::store::AttendanceStore;
use crate::utils::{client_ip::normalize_ip, validation::normalize_roll_number};

/// Which key matched when a record was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    ByRollNumber,
    ByIpAddress,
}

/// Removes one record for `date`: by roll number first, then by IP address.
pub async fn delete_record<S: AttendanceStore>(
    store: &S,
    roll_number: &str,
    date: NaiveDate,
    ip_address: Option<&str>,
) -> Result<Removed, AttendanceError> {
    let roll_number = normalize_roll_number(roll_number);
    if roll_number.is_empty() {
        return Err(AttendanceError::InvalidRollNumber);
    }

    if store.delete_by_roll(&roll_number, date).await? {
        info!(%roll_number, %date, "Attendance record deleted");
        return Ok(Removed::ByRollNumber);
    }

    if let Some(ip) = ip_address.map(normalize_ip).filter(|ip| !ip.is_empty()) {
        if store.delete_by_ip(&ip, date).await? {
            info!(%ip, %date, "Attendance record deleted by IP");
            return Ok(Removed::ByIpAddress);
        }
    }

    Err(AttendanceError::RecordNotFound)
}
