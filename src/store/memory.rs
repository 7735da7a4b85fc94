use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{AttendanceStore, LeaveCountStore, ToggleStore};
use crate::error::AttendanceError;
use crate::model::{
    app_state::{TogglePatch, ToggleState},
    attendance::{AttendanceRecord, NewAttendance},
};

/// In-process stand-in for the MySQL schema, including its unique key on
/// `(roll_number, attendance_date)`.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AttendanceRecord>>,
    toggles: Mutex<Option<ToggleState>>,
    leave_counts: Mutex<HashMap<String, i64>>,
    /// Makes lookups miss so inserts hit the unique key, as in a lost race.
    blind_lookups: bool,
}

impl MemoryStore {
    pub fn with_toggles(state: ToggleState) -> Self {
        Self {
            toggles: Mutex::new(Some(state)),
            ..Default::default()
        }
    }

    pub fn with_blind_lookups() -> Self {
        Self {
            blind_lookups: true,
            ..Default::default()
        }
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AttendanceStore for MemoryStore {
    async fn find_by_roll(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        if self.blind_lookups {
            return Ok(None);
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.roll_number == roll_number && r.attendance_date == date)
            .cloned())
    }

    async fn find_by_ip(
        &self,
        ip_address: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        if self.blind_lookups {
            return Ok(None);
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.ip_address == ip_address && r.attendance_date == date)
            .cloned())
    }

    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceRecord, AttendanceError> {
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.roll_number == entry.roll_number && r.attendance_date == entry.attendance_date)
        {
            return Err(AttendanceError::DuplicateRollNumber);
        }
        let record = entry.into_record(records.len() as u64 + 1);
        records.push(record.clone());
        Ok(record)
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let mut rows: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.attendance_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(rows)
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let mut rows = self.records();
        rows.sort_by(|a, b| {
            b.attendance_date
                .cmp(&a.attendance_date)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Ok(rows)
    }

    async fn count_by_date(&self, date: NaiveDate) -> Result<i64, AttendanceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.attendance_date == date)
            .count() as i64)
    }

    async fn delete_by_roll(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> Result<bool, AttendanceError> {
        let mut records = self.records.lock().unwrap();
        match records
            .iter()
            .position(|r| r.roll_number == roll_number && r.attendance_date == date)
        {
            Some(idx) => {
                records.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_ip(&self, ip_address: &str, date: NaiveDate) -> Result<bool, AttendanceError> {
        let mut records = self.records.lock().unwrap();
        match records
            .iter()
            .position(|r| r.ip_address == ip_address && r.attendance_date == date)
        {
            Some(idx) => {
                records.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl ToggleStore for MemoryStore {
    async fn load_toggles(&self) -> Result<ToggleState, AttendanceError> {
        Ok(self
            .toggles
            .lock()
            .unwrap()
            .get_or_insert_with(ToggleState::default)
            .clone())
    }

    async fn apply_toggle(&self, patch: TogglePatch) -> Result<ToggleState, AttendanceError> {
        let mut guard = self.toggles.lock().unwrap();
        let state = guard.get_or_insert_with(ToggleState::default);
        match patch {
            TogglePatch::Attendance(v) => state.toggle_attendance = v,
            TogglePatch::Input(v) => state.toggle_input = v,
            TogglePatch::Note(v) => state.note = v,
        }
        Ok(state.clone())
    }
}

impl LeaveCountStore for MemoryStore {
    async fn leave_count(&self, roll_number: &str) -> Result<Option<i64>, AttendanceError> {
        Ok(self.leave_counts.lock().unwrap().get(roll_number).copied())
    }

    async fn upsert_leave_count(
        &self,
        roll_number: &str,
        count: i64,
    ) -> Result<(), AttendanceError> {
        self.leave_counts
            .lock()
            .unwrap()
            .insert(roll_number.to_string(), count);
        Ok(())
    }
}
