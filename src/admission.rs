use std::net::IpAddr;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, NewAttendance};
use crate::store::{AttendanceStore, ToggleStore};
use crate::utils::{
    client_ip::normalize_ip,
    clock::submission_time,
    validation::{is_valid_name, is_valid_roll_number, normalize_roll_number},
};

/// Student-supplied part of a submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub roll_number: String,
    pub name: String,
    pub optional_field: Option<String>,
}

impl Submission {
    /// Reads a submission body without rejecting it: a missing or non-string
    /// field becomes empty, which validation then refuses.
    pub fn from_json(payload: &Value) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            roll_number: text("rollNumber").unwrap_or_default(),
            name: text("name").unwrap_or_default(),
            optional_field: text("optionalField"),
        }
    }
}

/// Settings for the one-submission-per-IP-per-day heuristic.
///
/// Shared classroom networks put many students behind one public address, so
/// the check stays off unless explicitly enabled.
#[derive(Debug, Clone, Default)]
pub struct IpCheck {
    pub enforce: bool,
    pub allow_list: Vec<String>,
}

impl IpCheck {
    fn exempts(&self, ip: &str) -> bool {
        ip.parse::<IpAddr>().is_ok_and(|addr| addr.is_loopback())
            || self.allow_list.iter().any(|allowed| allowed == ip)
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub utc_offset: FixedOffset,
    pub ip_check: IpCheck,
}

impl AdmissionPolicy {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            utc_offset: config.utc_offset,
            ip_check: IpCheck {
                enforce: config.enforce_ip_check,
                allow_list: config.admin_ips.clone(),
            },
        }
    }

    /// Accepts or rejects one submission. Validation happens before any
    /// write; the storage unique key has the final word on duplicates.
    #[instrument(skip(self, store, submission), fields(roll_number = %submission.roll_number))]
    pub async fn admit<S>(
        &self,
        store: &S,
        submission: Submission,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AttendanceError>
    where
        S: AttendanceStore + ToggleStore,
    {
        let toggles = store.load_toggles().await?;
        if !toggles.toggle_attendance {
            return Err(AttendanceError::ClassClosed);
        }

        let roll_number = submission.roll_number.trim();
        if !is_valid_roll_number(roll_number) {
            return Err(AttendanceError::InvalidRollNumber);
        }

        let name = submission.name.trim();
        if !is_valid_name(name) {
            return Err(AttendanceError::InvalidName);
        }

        let time = submission_time(now, self.utc_offset);
        let roll_number = normalize_roll_number(roll_number);

        if store
            .find_by_roll(&roll_number, time.attendance_date)
            .await?
            .is_some()
        {
            return Err(AttendanceError::DuplicateRollNumber);
        }

        let ip_address = normalize_ip(client_ip);
        if self.ip_check.enforce && !self.ip_check.exempts(&ip_address) {
            if let Some(existing) = store.find_by_ip(&ip_address, time.attendance_date).await? {
                warn!(
                    ip = %ip_address,
                    existing_roll_number = %existing.roll_number,
                    "Second submission from the same address today"
                );
                return Err(AttendanceError::DuplicateIp);
            }
        }

        let optional_field = if toggles.toggle_input {
            submission
                .optional_field
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
        } else {
            None
        };

        let record = store
            .insert(NewAttendance {
                roll_number,
                name: name.to_string(),
                optional_field,
                attendance_date: time.attendance_date,
                timestamp: time.timestamp,
                ip_address,
            })
            .await?;

        info!(
            id = record.id,
            date = %record.attendance_date,
            "Attendance recorded"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::app_state::ToggleState;
    use crate::store::memory::MemoryStore;
    use chrono::{NaiveDate, TimeZone};

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy {
            utc_offset: FixedOffset::east_opt(6 * 3600).unwrap(),
            ip_check: IpCheck::default(),
        }
    }

    fn strict_policy(allow: &[&str]) -> AdmissionPolicy {
        AdmissionPolicy {
            ip_check: IpCheck {
                enforce: true,
                allow_list: allow.iter().map(|s| s.to_string()).collect(),
            },
            ..policy()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 12, 3, 15, 42).unwrap()
    }

    fn submission(roll: &str, name: &str) -> Submission {
        Submission {
            roll_number: roll.to_string(),
            name: name.to_string(),
            optional_field: None,
        }
    }

    #[actix_web::test]
    async fn first_submission_is_recorded_for_the_local_date() {
        let store = MemoryStore::default();
        let record = policy()
            .admit(&store, submission("CS101", "Alice Smith"), "::ffff:10.0.0.7", now())
            .await
            .unwrap();

        assert_eq!(record.roll_number, "CS101");
        assert_eq!(record.name, "Alice Smith");
        assert_eq!(record.attendance_date, NaiveDate::from_ymd_opt(2025, 8, 12).unwrap());
        assert_eq!(record.timestamp, "09:15:42");
        assert_eq!(record.ip_address, "10.0.0.7");
        assert_eq!(store.records().len(), 1);
    }

    #[actix_web::test]
    async fn second_submission_same_day_is_a_duplicate() {
        let store = MemoryStore::default();
        let p = policy();
        p.admit(&store, submission("CS101", "Alice Smith"), "10.0.0.7", now())
            .await
            .unwrap();

        let again = p
            .admit(&store, submission("CS101", "Alice Smith"), "10.0.0.8", now())
            .await;
        assert_eq!(again, Err(AttendanceError::DuplicateRollNumber));

        // Roll numbers collide case-insensitively
        let lower = p.admit(&store, submission("cs101", "Bob"), "10.0.0.9", now()).await;
        assert_eq!(lower, Err(AttendanceError::DuplicateRollNumber));
        assert_eq!(store.records().len(), 1);
    }

    #[actix_web::test]
    async fn next_day_is_a_fresh_slot() {
        let store = MemoryStore::default();
        let p = policy();
        p.admit(&store, submission("CS101", "Alice Smith"), "10.0.0.7", now())
            .await
            .unwrap();

        let tomorrow = now() + chrono::Duration::days(1);
        let record = p
            .admit(&store, submission("CS101", "Alice Smith"), "10.0.0.7", tomorrow)
            .await
            .unwrap();
        assert_eq!(record.attendance_date, NaiveDate::from_ymd_opt(2025, 8, 13).unwrap());
    }

    #[actix_web::test]
    async fn lowercase_roll_number_is_stored_uppercase() {
        let store = MemoryStore::default();
        let record = policy()
            .admit(&store, submission(" abc123 ", "Carol"), "10.0.0.7", now())
            .await
            .unwrap();
        assert_eq!(record.roll_number, "ABC123");

        let found = store
            .find_by_roll("ABC123", record.attendance_date)
            .await
            .unwrap();
        assert_eq!(found, Some(record));
    }

    #[actix_web::test]
    async fn closed_class_rejects_even_invalid_payloads() {
        let store = MemoryStore::with_toggles(ToggleState {
            toggle_attendance: false,
            ..ToggleState::default()
        });
        let p = policy();

        let valid = p.admit(&store, submission("CS101", "Alice"), "10.0.0.7", now()).await;
        assert_eq!(valid, Err(AttendanceError::ClassClosed));

        let invalid = p.admit(&store, submission("", "1234"), "10.0.0.7", now()).await;
        assert_eq!(invalid, Err(AttendanceError::ClassClosed));
        assert!(store.records().is_empty());
    }

    #[test]
    fn loose_json_body_becomes_empty_fields() {
        let sub = Submission::from_json(&serde_json::json!({
            "rollNumber": 123,
            "name": "Bob",
            "optionalField": "stack"
        }));
        assert_eq!(sub.roll_number, "");
        assert_eq!(sub.name, "Bob");
        assert_eq!(sub.optional_field.as_deref(), Some("stack"));

        let sub = Submission::from_json(&Value::Null);
        assert_eq!(sub.roll_number, "");
        assert_eq!(sub.name, "");
        assert_eq!(sub.optional_field, None);
    }

    #[actix_web::test]
    async fn validation_runs_roll_number_before_name() {
        let store = MemoryStore::default();
        let p = policy();

        let both_bad = p.admit(&store, submission("CS-1", "R2D2"), "10.0.0.7", now()).await;
        assert_eq!(both_bad, Err(AttendanceError::InvalidRollNumber));

        let bad_name = p.admit(&store, submission("CS1", "R2D2"), "10.0.0.7", now()).await;
        assert_eq!(bad_name, Err(AttendanceError::InvalidName));

        let blank_name = p.admit(&store, submission("CS1", "   "), "10.0.0.7", now()).await;
        assert_eq!(blank_name, Err(AttendanceError::InvalidName));
        assert!(store.records().is_empty());
    }

    #[actix_web::test]
    async fn optional_field_kept_only_when_input_toggle_is_on() {
        let mut sub = submission("CS101", "Alice");
        sub.optional_field = Some("  a linked list  ".to_string());

        let off = MemoryStore::default();
        let record = policy()
            .admit(&off, sub.clone(), "10.0.0.7", now())
            .await
            .unwrap();
        assert_eq!(record.optional_field, None);

        let on = MemoryStore::with_toggles(ToggleState {
            toggle_input: true,
            ..ToggleState::default()
        });
        let record = policy().admit(&on, sub, "10.0.0.7", now()).await.unwrap();
        assert_eq!(record.optional_field.as_deref(), Some("a linked list"));
    }

    #[actix_web::test]
    async fn lost_insert_race_reports_duplicate() {
        let store = MemoryStore::with_blind_lookups();
        let p = policy();
        p.admit(&store, submission("CS101", "Alice"), "10.0.0.7", now())
            .await
            .unwrap();

        let racing = p.admit(&store, submission("CS101", "Alice"), "10.0.0.8", now()).await;
        assert_eq!(racing, Err(AttendanceError::DuplicateRollNumber));
    }

    #[actix_web::test]
    async fn shared_ip_allowed_unless_check_enforced() {
        let store = MemoryStore::default();
        let lenient = policy();
        lenient
            .admit(&store, submission("CS101", "Alice"), "203.0.113.7", now())
            .await
            .unwrap();
        lenient
            .admit(&store, submission("CS102", "Bob"), "203.0.113.7", now())
            .await
            .unwrap();

        let strict = strict_policy(&[]);
        let proxied = strict
            .admit(&store, submission("CS103", "Carol"), "::ffff:203.0.113.7", now())
            .await;
        assert_eq!(proxied, Err(AttendanceError::DuplicateIp));
        assert_eq!(store.records().len(), 2);
    }

    #[actix_web::test]
    async fn admin_and_loopback_addresses_skip_ip_check() {
        let store = MemoryStore::default();
        let strict = strict_policy(&["192.168.1.5"]);

        let entries = [
            ("A1", "192.168.1.5"),
            ("A2", "192.168.1.5"),
            ("B1", "127.0.0.1"),
            ("B2", "127.0.0.1"),
            ("C1", "::1"),
            ("C2", "::1"),
        ];
        for (roll, ip) in entries {
            strict
                .admit(&store, submission(roll, "Admin Entry"), ip, now())
                .await
                .unwrap();
        }
        assert_eq!(store.records().len(), 6);
    }
}
