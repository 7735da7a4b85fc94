use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "rollNumber": "CS101",
        "name": "Alice Smith",
        "optionalField": null,
        "attendanceDate": "2025-08-12",
        "timestamp": "09:15:42",
        "ipAddress": "203.0.113.7"
    })
)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "CS101")]
    pub roll_number: String,

    #[schema(example = "Alice Smith")]
    pub name: String,

    #[schema(nullable = true)]
    pub optional_field: Option<String>,

    #[schema(example = "2025-08-12", format = "date", value_type = String)]
    pub attendance_date: NaiveDate,

    /// Time of day the submission was accepted, `HH:MM:SS`.
    #[schema(example = "09:15:42")]
    pub timestamp: String,

    #[schema(example = "203.0.113.7")]
    pub ip_address: String,
}

/// A validated submission ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendance {
    pub roll_number: String,
    pub name: String,
    pub optional_field: Option<String>,
    pub attendance_date: NaiveDate,
    pub timestamp: String,
    pub ip_address: String,
}

impl NewAttendance {
    pub fn into_record(self, id: u64) -> AttendanceRecord {
        AttendanceRecord {
            id,
            roll_number: self.roll_number,
            name: self.name,
            optional_field: self.optional_field,
            attendance_date: self.attendance_date,
            timestamp: self.timestamp,
            ip_address: self.ip_address,
        }
    }
}
