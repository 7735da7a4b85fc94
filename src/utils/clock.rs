use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Calendar day and `HH:MM:SS` stamp for a submission, both taken from the
/// server clock shifted into the fixed regional offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTime {
    pub attendance_date: NaiveDate,
    pub timestamp: String,
}

pub fn submission_time(now: DateTime<Utc>, offset: FixedOffset) -> SubmissionTime {
    let local = now.with_timezone(&offset);
    SubmissionTime {
        attendance_date: local.date_naive(),
        timestamp: local.format("%H:%M:%S").to_string(),
    }
}

pub fn attendance_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}
