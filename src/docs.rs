use crate::api::attendance::{DeleteAttendance, SubmitAttendance};
use crate::leave_count::{
    ImportOutcome, ImportReport, ImportStatus, LeaveCountRow, LeaveLookup, SheetPreview,
    SheetPreviewRow,
};
use crate::model::app_state::ToggleState;
use crate::model::attendance::AttendanceRecord;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Classroom Attendance API",
        version = "1.0.0",
        description = r#"
## Classroom Attendance

Students mark themselves present once per day from a shared link. The
instructor opens and closes submissions, reviews the day's list and
exports it as CSV.

### Key Features
- **Submission**
  - One record per roll number per day, validated before any write
- **Dashboard**
  - Per-day list with search, sort, count and CSV export
  - Delete by roll number, falling back to IP address
- **Toggles**
  - Open/close submissions, show an extra answer field, set a note
- **Leave Count**
  - Absence counts imported from JSON or the roster Google Sheet

### Response Format
- JSON bodies carry `success` and either `data` or `message`
- The export endpoint returns `text/csv`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::add_attendance,
        crate::api::attendance::list_attendance,
        crate::api::attendance::list_all_attendance,
        crate::api::attendance::count_attendance,
        crate::api::attendance::export_attendance,
        crate::api::attendance::delete_attendance,
        crate::api::attendance::close_attendance,

        crate::api::toggle::get_toggles,
        crate::api::toggle::get_input,
        crate::api::toggle::set_input,
        crate::api::toggle::get_attendance,
        crate::api::toggle::set_attendance,
        crate::api::toggle::get_note,
        crate::api::toggle::set_note,

        crate::api::leave_count::leave_count,
        crate::api::leave_count::import_leave_counts,
        crate::api::leave_count::sync_from_sheet,
        crate::api::leave_count::sheet_preview
    ),
    components(
        schemas(
            SubmitAttendance,
            DeleteAttendance,
            AttendanceRecord,
            ToggleState,
            LeaveLookup,
            LeaveCountRow,
            ImportStatus,
            ImportOutcome,
            ImportReport,
            SheetPreviewRow,
            SheetPreview
        )
    ),
    tags(
        (name = "Attendance", description = "Submission and dashboard APIs"),
        (name = "Toggle", description = "Session switches and note"),
        (name = "Leave Count", description = "Imported absence counts"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/attendance/add",
            "/api/attendance/export",
            "/api/attendance/leave-count/import",
            "/api/toggle",
            "/api/toggle/set-note",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
