use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::IntoParams;

use crate::{
    error::AttendanceError,
    leave_count::{ImportReport, LeaveCountRow, LeaveCounts, SheetClient},
};

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCountQuery {
    /// Roll number to look up
    pub roll_number: Option<String>,
}

fn import_response(report: ImportReport) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Sync completed",
        "updated": report.updated,
        "failed": report.failed,
        "skipped": report.skipped,
        "results": report.results
    }))
}

#[utoipa::path(
    get,
    path = "/api/attendance/leave-count",
    params(LeaveCountQuery),
    responses(
        (status = 200, description = "Absences and sessions held; -1 when unknown", body = LeaveLookup),
        (status = 400, description = "Roll number missing"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Leave Count"
)]
pub async fn leave_count(
    pool: web::Data<MySqlPool>,
    leave_counts: web::Data<LeaveCounts>,
    query: web::Query<LeaveCountQuery>,
) -> actix_web::Result<impl Responder> {
    let roll_number = query
        .roll_number
        .as_deref()
        .ok_or(AttendanceError::InvalidRollNumber)?;
    let lookup = leave_counts.lookup(pool.get_ref(), roll_number).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "rollNumber": lookup.roll_number,
        "count": lookup.count,
        "totalCount": lookup.total_count
    })))
}

#[utoipa::path(
    post,
    path = "/api/attendance/leave-count/import",
    request_body(
        content = [LeaveCountRow],
        description = "Absence counts keyed by roll number; TOTAL_COUNT holds sessions held",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Import report", body = ImportReport),
        (status = 500, description = "Internal server error")
    ),
    tag = "Leave Count"
)]
pub async fn import_leave_counts(
    pool: web::Data<MySqlPool>,
    leave_counts: web::Data<LeaveCounts>,
    payload: web::Json<Vec<LeaveCountRow>>,
) -> actix_web::Result<impl Responder> {
    let report = leave_counts
        .import(pool.get_ref(), payload.into_inner())
        .await;
    Ok(import_response(report))
}

#[utoipa::path(
    post,
    path = "/api/attendance/sync-from-sheet",
    responses(
        (status = 200, description = "Roster sheet imported", body = ImportReport),
        (status = 502, description = "Sheet not configured or unreachable"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Leave Count"
)]
pub async fn sync_from_sheet(
    pool: web::Data<MySqlPool>,
    leave_counts: web::Data<LeaveCounts>,
    sheet: web::Data<SheetClient>,
) -> actix_web::Result<impl Responder> {
    let report = sheet.sync(&leave_counts, pool.get_ref()).await?;
    Ok(import_response(report))
}

#[utoipa::path(
    get,
    path = "/api/attendance/sheet-preview",
    responses(
        (status = 200, description = "First rows of the roster sheet", body = SheetPreview),
        (status = 502, description = "Sheet not configured or unreachable")
    ),
    tag = "Leave Count"
)]
pub async fn sheet_preview(sheet: web::Data<SheetClient>) -> actix_web::Result<impl Responder> {
    let preview = sheet.preview().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": preview
    })))
}
