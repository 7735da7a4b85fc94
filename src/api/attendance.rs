use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    admission::{AdmissionPolicy, Submission},
    error::AttendanceError,
    model::attendance::AttendanceRecord,
    records::{Removed, delete_record},
    store::{AttendanceStore, ToggleStore},
    toggle,
    utils::{
        client_ip::ClientIp,
        clock::attendance_date,
        list_view::{self, CSV_HEADERS, SortDirection, SortKey, SortState},
    },
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttendance {
    #[schema(example = "CS101")]
    #[serde(default)]
    pub roll_number: String,
    #[schema(example = "Alice Smith")]
    #[serde(default)]
    pub name: String,
    /// Only stored while the extra input toggle is on
    #[schema(example = "A queue is FIFO", nullable = true)]
    pub optional_field: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAttendance {
    #[schema(example = "CS101")]
    #[serde(default)]
    pub roll_number: String,
    #[schema(example = "2025-08-12", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Fallback key when no record matches the roll number
    #[schema(example = "203.0.113.7", nullable = true)]
    pub ip_address: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Attendance date, defaults to today
    pub date: Option<NaiveDate>,
    /// Case-insensitive search over roll number, name and answer
    pub q: Option<String>,
    /// rollNumber | name | timestamp | ipAddress | optionalField | attendanceDate
    pub sort: Option<String>,
    /// asc | desc
    pub direction: Option<String>,
    /// Column header clicked: same column flips the direction, a new one starts ascending
    pub select: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// Attendance date, defaults to today
    pub date: Option<NaiveDate>,
}

fn resolve_date(date: Option<NaiveDate>, policy: &AdmissionPolicy) -> NaiveDate {
    date.unwrap_or_else(|| attendance_date(Utc::now(), policy.utc_offset))
}

fn sort_key(raw: Option<&str>) -> Result<Option<SortKey>, AttendanceError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| AttendanceError::InvalidQuery(format!("unknown sort key {s:?}")))
        })
        .transpose()
}

fn sort_state(query: &ListQuery) -> Result<SortState, AttendanceError> {
    let direction = match query.direction.as_deref() {
        Some(d) if !d.is_empty() => d
            .parse::<SortDirection>()
            .map_err(|_| AttendanceError::InvalidQuery(format!("unknown direction {d:?}")))?,
        _ => SortDirection::Asc,
    };
    let current = SortState {
        key: sort_key(query.sort.as_deref())?,
        direction,
    };

    Ok(match sort_key(query.select.as_deref())? {
        Some(key) => current.select(key),
        None => current,
    })
}

/// Filter first, then sort, so exported rows match the dashboard view.
fn shape_view(
    records: Vec<AttendanceRecord>,
    query: &ListQuery,
) -> Result<(Vec<AttendanceRecord>, SortState), AttendanceError> {
    let state = sort_state(query)?;
    let filtered = match query.q.as_deref() {
        Some(q) => list_view::filter(&records, q),
        None => records,
    };

    Ok((state.apply(&filtered), state))
}

/// Runs admission on a raw body. A body that is not JSON, or has fields of the
/// wrong type, still reaches the class-open check before validation rejects it.
async fn submit<S>(
    store: &S,
    policy: &AdmissionPolicy,
    client_ip: &str,
    body: &[u8],
) -> actix_web::Result<HttpResponse>
where
    S: AttendanceStore + ToggleStore,
{
    let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let submission = Submission::from_json(&payload);

    let record = policy.admit(store, submission, client_ip, Utc::now()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Attendance added.",
        "data": record
    })))
}

/* =========================
Submit attendance
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/add",
    request_body(
        content = SubmitAttendance,
        description = "Student submission",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Attendance added", body = Object, example = json!({
            "success": true,
            "message": "Attendance added."
        })),
        (status = 400, description = "Class closed, invalid roll number or invalid name", body = Object, example = json!({
            "success": false,
            "message": "Not the class time..."
        })),
        (status = 409, description = "Already marked present today", body = Object, example = json!({
            "success": false,
            "message": "Roll number already marked present."
        })),
        (status = 429, description = "Too many requests"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn add_attendance(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AdmissionPolicy>,
    ClientIp(client_ip): ClientIp,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    submit(pool.get_ref(), &policy, &client_ip, &body).await
}

/* =========================
Admin list views
========================= */
#[utoipa::path(
    get,
    path = "/api/attendance/list",
    params(ListQuery),
    responses(
        (status = 200, description = "Records for the date, filtered and sorted, with the resulting sort state", body = [AttendanceRecord]),
        (status = 400, description = "Bad query"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AdmissionPolicy>,
    query: web::Query<ListQuery>,
) -> actix_web::Result<impl Responder> {
    let date = resolve_date(query.date, &policy);
    let records = pool.list_by_date(date).await?;
    let (records, sort) = shape_view(records, &query)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "date": date,
        "sort": sort.key,
        "direction": sort.direction,
        "data": records
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/list-all",
    responses(
        (status = 200, description = "Every record, newest date first", body = [AttendanceRecord]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn list_all_attendance(
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let records = pool.list_all().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": records
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/count",
    params(DateQuery),
    responses(
        (status = 200, description = "Number of students present", body = Object, example = json!({
            "success": true,
            "date": "2025-08-12",
            "count": 42
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn count_attendance(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AdmissionPolicy>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    let date = resolve_date(query.date, &policy);
    let count = pool.count_by_date(date).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "date": date,
        "count": count
    })))
}

#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(ListQuery),
    responses(
        (status = 200, description = "CSV of the filtered and sorted list", content_type = "text/csv", body = String),
        (status = 400, description = "Bad query"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn export_attendance(
    pool: web::Data<MySqlPool>,
    policy: web::Data<AdmissionPolicy>,
    query: web::Query<ListQuery>,
) -> actix_web::Result<impl Responder> {
    let date = resolve_date(query.date, &policy);
    let (records, _) = shape_view(pool.list_by_date(date).await?, &query)?;
    let csv = list_view::to_csv(&records, &CSV_HEADERS);

    info!(%date, rows = records.len(), "Attendance exported");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendance_{date}.csv\""),
        ))
        .body(csv))
}

/* =========================
Delete / close
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/delete",
    request_body(
        content = DeleteAttendance,
        description = "Record to remove",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Record deleted", body = Object, example = json!({
            "success": true,
            "message": "Attendance record deleted."
        })),
        (status = 400, description = "Roll number missing"),
        (status = 404, description = "No matching record", body = Object, example = json!({
            "success": false,
            "message": "Attendance record not found."
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    pool: web::Data<MySqlPool>,
    payload: web::Json<DeleteAttendance>,
) -> actix_web::Result<impl Responder> {
    let removed = delete_record(
        pool.get_ref(),
        &payload.roll_number,
        payload.date,
        payload.ip_address.as_deref(),
    )
    .await?;

    let message = match removed {
        Removed::ByRollNumber => "Attendance record deleted.",
        Removed::ByIpAddress => "Attendance record deleted by IP.",
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message
    })))
}

#[utoipa::path(
    post,
    path = "/api/attendance/close-attendance",
    responses(
        (status = 200, description = "Submissions closed", body = Object, example = json!({
            "success": true,
            "state": false
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn close_attendance(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let state = toggle::close_attendance(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "state": state.toggle_attendance
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::app_state::ToggleState,
        store::memory::MemoryStore,
    };
    use actix_web::{App, http::StatusCode, test};
    use chrono::FixedOffset;

    fn record(roll: &str, name: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            roll_number: roll.to_string(),
            name: name.to_string(),
            optional_field: None,
            attendance_date: NaiveDate::from_ymd_opt(2025, 8, 12).unwrap(),
            timestamp: "09:00:00".to_string(),
            ip_address: "10.0.0.1".to_string(),
        }
    }

    fn query(q: Option<&str>, sort: Option<&str>, direction: Option<&str>) -> ListQuery {
        ListQuery {
            date: None,
            q: q.map(str::to_string),
            sort: sort.map(str::to_string),
            direction: direction.map(str::to_string),
            select: None,
        }
    }

    fn rolls(records: &[AttendanceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.roll_number.as_str()).collect()
    }

    #[::core::prelude::v1::test]
    fn view_filters_then_sorts() {
        let records = vec![record("CS2", "Bob"), record("CS1", "Bobby"), record("CS3", "Ann")];
        let (view, _) =
            shape_view(records, &query(Some("bob"), Some("rollNumber"), Some("desc"))).unwrap();
        assert_eq!(rolls(&view), ["CS2", "CS1"]);
    }

    #[::core::prelude::v1::test]
    fn view_without_sort_keeps_store_order() {
        let records = vec![record("CS2", "Bob"), record("CS1", "Ann")];
        let (view, state) = shape_view(records.clone(), &query(None, None, None)).unwrap();
        assert_eq!(view, records);
        assert_eq!(state, SortState::default());
    }

    #[::core::prelude::v1::test]
    fn selecting_the_active_column_flips_direction() {
        let records = vec![record("CS2", "Bob"), record("CS1", "Ann"), record("CS3", "Cy")];

        let mut q = query(None, Some("rollNumber"), Some("asc"));
        q.select = Some("rollNumber".to_string());
        let (view, state) = shape_view(records.clone(), &q).unwrap();
        assert_eq!(state.key, Some(SortKey::RollNumber));
        assert_eq!(state.direction, SortDirection::Desc);
        assert_eq!(rolls(&view), ["CS3", "CS2", "CS1"]);

        // A different column starts ascending whatever the old direction was
        let mut q = query(None, Some("rollNumber"), Some("desc"));
        q.select = Some("name".to_string());
        let (view, state) = shape_view(records, &q).unwrap();
        assert_eq!(state.key, Some(SortKey::Name));
        assert_eq!(state.direction, SortDirection::Asc);
        assert_eq!(rolls(&view), ["CS1", "CS2", "CS3"]);
    }

    #[::core::prelude::v1::test]
    fn unknown_sort_key_is_rejected() {
        let err = shape_view(vec![], &query(None, Some("age"), None)).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidQuery(_)));

        let err = shape_view(vec![], &query(None, Some("name"), Some("up"))).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidQuery(_)));

        let mut q = query(None, None, None);
        q.select = Some("age".to_string());
        assert!(matches!(
            shape_view(vec![], &q).unwrap_err(),
            AttendanceError::InvalidQuery(_)
        ));
    }

    async fn add_to_memory(
        store: web::Data<MemoryStore>,
        policy: web::Data<AdmissionPolicy>,
        ClientIp(client_ip): ClientIp,
        body: web::Bytes,
    ) -> actix_web::Result<HttpResponse> {
        submit(store.get_ref(), &policy, &client_ip, &body).await
    }

    fn test_policy() -> AdmissionPolicy {
        AdmissionPolicy {
            utc_offset: FixedOffset::east_opt(6 * 3600).unwrap(),
            ip_check: Default::default(),
        }
    }

    #[actix_web::test]
    async fn closed_class_answers_before_body_is_validated() {
        let store = web::Data::new(MemoryStore::with_toggles(ToggleState {
            toggle_attendance: false,
            ..ToggleState::default()
        }));
        let app = test::init_service(
            App::new()
                .app_data(store.clone())
                .app_data(web::Data::new(test_policy()))
                .route("/add", web::post().to(add_to_memory)),
        )
        .await;

        for body in [
            r#"{"rollNumber":123,"name":"Bob"}"#,
            "not json",
            r#"{"rollNumber":"CS101","name":"Alice"}"#,
        ] {
            let req = test::TestRequest::post()
                .uri("/add")
                .insert_header(("content-type", "application/json"))
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");

            let value: Value = test::read_body_json(resp).await;
            assert_eq!(value["success"], false);
            assert_eq!(value["message"], "Not the class time...");
        }
        assert!(store.records().is_empty());
    }

    #[actix_web::test]
    async fn open_class_rejects_mistyped_fields_as_invalid() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(MemoryStore::default()))
                .app_data(web::Data::new(test_policy()))
                .route("/add", web::post().to(add_to_memory)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/add")
            .set_payload(r#"{"rollNumber":123,"name":"Bob"}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let value: Value = test::read_body_json(resp).await;
        assert_eq!(value["message"], "Invalid roll number.");

        let req = test::TestRequest::post()
            .uri("/add")
            .set_json(json!({"rollNumber": "cs101", "name": "Bob"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let value: Value = test::read_body_json(resp).await;
        assert_eq!(value["data"]["rollNumber"], "CS101");
    }
}
