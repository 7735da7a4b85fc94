use chrono::NaiveDate;
use sqlx::MySqlPool;

use super::{AttendanceStore, LeaveCountStore, ToggleStore};
use crate::error::AttendanceError;
use crate::model::{
    app_state::{GLOBAL_IDENTIFIER, TogglePatch, ToggleState},
    attendance::{AttendanceRecord, NewAttendance},
};

const RECORD_COLUMNS: &str =
    "id, roll_number, name, optional_field, attendance_date, timestamp, ip_address";

/// SQLSTATE raised by MySQL for integrity constraint violations.
const INTEGRITY_VIOLATION: &str = "23000";

fn storage_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AttendanceError {
    move |e| {
        tracing::error!(error = %e, context, "Storage failure");
        AttendanceError::StorageUnavailable
    }
}

fn is_integrity_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(INTEGRITY_VIOLATION),
        _ => false,
    }
}

impl AttendanceStore for MySqlPool {
    async fn find_by_roll(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE roll_number = ? AND attendance_date = ?"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(roll_number)
            .bind(date)
            .fetch_optional(self)
            .await
            .map_err(storage_error("find attendance by roll number"))
    }

    async fn find_by_ip(
        &self,
        ip_address: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE ip_address = ? AND attendance_date = ? LIMIT 1"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(ip_address)
            .bind(date)
            .fetch_optional(self)
            .await
            .map_err(storage_error("find attendance by ip"))
    }

    async fn insert(&self, entry: NewAttendance) -> Result<AttendanceRecord, AttendanceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (roll_number, name, optional_field, attendance_date, timestamp, ip_address)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.roll_number)
        .bind(&entry.name)
        .bind(&entry.optional_field)
        .bind(entry.attendance_date)
        .bind(&entry.timestamp)
        .bind(&entry.ip_address)
        .execute(self)
        .await;

        match result {
            Ok(done) => Ok(entry.into_record(done.last_insert_id())),
            // Lost the race against a concurrent submission for the same day
            Err(e) if is_integrity_violation(&e) => Err(AttendanceError::DuplicateRollNumber),
            Err(e) => Err(storage_error("insert attendance")(e)),
        }
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE attendance_date = ? ORDER BY timestamp DESC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(date)
            .fetch_all(self)
            .await
            .map_err(storage_error("list attendance by date"))
    }

    async fn list_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance ORDER BY attendance_date DESC, timestamp DESC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .fetch_all(self)
            .await
            .map_err(storage_error("list all attendance"))
    }

    async fn count_by_date(&self, date: NaiveDate) -> Result<i64, AttendanceError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE attendance_date = ?")
            .bind(date)
            .fetch_one(self)
            .await
            .map_err(storage_error("count attendance"))
    }

    async fn delete_by_roll(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> Result<bool, AttendanceError> {
        let result =
            sqlx::query("DELETE FROM attendance WHERE roll_number = ? AND attendance_date = ?")
                .bind(roll_number)
                .bind(date)
                .execute(self)
                .await
                .map_err(storage_error("delete attendance by roll number"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_ip(&self, ip_address: &str, date: NaiveDate) -> Result<bool, AttendanceError> {
        // One row only, same as the roll-number path
        let result = sqlx::query(
            "DELETE FROM attendance WHERE ip_address = ? AND attendance_date = ? LIMIT 1",
        )
        .bind(ip_address)
        .bind(date)
        .execute(self)
        .await
        .map_err(storage_error("delete attendance by ip"))?;
        Ok(result.rows_affected() > 0)
    }
}

impl ToggleStore for MySqlPool {
    async fn load_toggles(&self) -> Result<ToggleState, AttendanceError> {
        sqlx::query("INSERT IGNORE INTO app_state (identifier) VALUES (?)")
            .bind(GLOBAL_IDENTIFIER)
            .execute(self)
            .await
            .map_err(storage_error("ensure app state"))?;

        sqlx::query_as::<_, ToggleState>(
            "SELECT toggle_attendance, toggle_input, note FROM app_state WHERE identifier = ?",
        )
        .bind(GLOBAL_IDENTIFIER)
        .fetch_one(self)
        .await
        .map_err(storage_error("load app state"))
    }

    async fn apply_toggle(&self, patch: TogglePatch) -> Result<ToggleState, AttendanceError> {
        // Single-statement upsert: the row is created with defaults for the
        // untouched columns if it does not exist yet.
        let query = match patch {
            TogglePatch::Attendance(v) => sqlx::query(
                r#"
                INSERT INTO app_state (identifier, toggle_attendance) VALUES (?, ?)
                ON DUPLICATE KEY UPDATE toggle_attendance = VALUES(toggle_attendance)
                "#,
            )
            .bind(GLOBAL_IDENTIFIER)
            .bind(v),
            TogglePatch::Input(v) => sqlx::query(
                r#"
                INSERT INTO app_state (identifier, toggle_input) VALUES (?, ?)
                ON DUPLICATE KEY UPDATE toggle_input = VALUES(toggle_input)
                "#,
            )
            .bind(GLOBAL_IDENTIFIER)
            .bind(v),
            TogglePatch::Note(v) => sqlx::query(
                r#"
                INSERT INTO app_state (identifier, note) VALUES (?, ?)
                ON DUPLICATE KEY UPDATE note = VALUES(note)
                "#,
            )
            .bind(GLOBAL_IDENTIFIER)
            .bind(v),
        };

        query
            .execute(self)
            .await
            .map_err(storage_error("update app state"))?;

        self.load_toggles().await
    }
}

impl LeaveCountStore for MySqlPool {
    async fn leave_count(&self, roll_number: &str) -> Result<Option<i64>, AttendanceError> {
        sqlx::query_scalar::<_, i64>("SELECT count FROM leave_counts WHERE roll_number = ?")
            .bind(roll_number)
            .fetch_optional(self)
            .await
            .map_err(storage_error("fetch leave count"))
    }

    async fn upsert_leave_count(
        &self,
        roll_number: &str,
        count: i64,
    ) -> Result<(), AttendanceError> {
        sqlx::query(
            r#"
            INSERT INTO leave_counts (roll_number, count) VALUES (?, ?)
            ON DUPLICATE KEY UPDATE count = VALUES(count)
            "#,
        )
        .bind(roll_number)
        .bind(count)
        .execute(self)
        .await
        .map_err(storage_error("upsert leave count"))?;
        Ok(())
    }
}
