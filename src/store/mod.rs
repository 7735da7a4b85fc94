//! Persistence seams for attendance records, the global toggle row and
//! imported leave counts.
//!
//! The MySQL pool implements every trait directly, so handlers keep taking
//! `web::Data<MySqlPool>`. Tests run the same logic against `memory::MemoryStore`.

use chrono::NaiveDate;

use crate::error::AttendanceError;
use crate::model::{
    app_state::{TogglePatch, ToggleState},
    attendance::{AttendanceRecord, NewAttendance},
};

pub mod mysql;

#[cfg(test)]
pub mod memory;

#[allow(async_fn_in_trait)]
pub trait AttendanceStore {
    async fn find_by_roll(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError>;

    async fn find_by_ip(
        &self,
        ip_address: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError>;

    /// Must map a `(roll_number, attendance_date)` key collision to
    /// `AttendanceError::DuplicateRollNumber`.
    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceRecord, AttendanceError>;

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError>;

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError>;

    async fn count_by_date(&self, date: NaiveDate) -> Result<i64, AttendanceError>;

    /// Returns whether a row was removed.
    async fn delete_by_roll(&self, roll_number: &str, date: NaiveDate)
    -> Result<bool, AttendanceError>;

    async fn delete_by_ip(&self, ip_address: &str, date: NaiveDate) -> Result<bool, AttendanceError>;
}

#[allow(async_fn_in_trait)]
pub trait ToggleStore {
    /// Reads the global row, creating it with defaults when missing.
    async fn load_toggles(&self) -> Result<ToggleState, AttendanceError>;

    /// Applies one change atomically and returns the resulting state.
    async fn apply_toggle(&self, patch: TogglePatch) -> Result<ToggleState, AttendanceError>;
}

#[allow(async_fn_in_trait)]
pub trait LeaveCountStore {
    async fn leave_count(&self, roll_number: &str) -> Result<Option<i64>, AttendanceError>;

    async fn upsert_leave_count(&self, roll_number: &str, count: i64)
    -> Result<(), AttendanceError>;
}
