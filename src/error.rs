use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    error::{InternalError, JsonPayloadError, QueryPayloadError},
    http::StatusCode,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AttendanceError {
    #[error("Invalid roll number.")]
    InvalidRollNumber,

    #[error("Invalid name.")]
    InvalidName,

    #[error("Not the class time...")]
    ClassClosed,

    #[error("Roll number already marked present.")]
    DuplicateRollNumber,

    #[error("Proxy not allowed.")]
    DuplicateIp,

    #[error("Attendance record not found.")]
    RecordNotFound,

    #[error("Invalid state value")]
    InvalidToggleValue,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Sheet sync failed: {0}")]
    SheetSync(String),

    /// Detail is logged where the failure happens, never returned to clients.
    #[error("Internal Server Error")]
    StorageUnavailable,
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::InvalidRollNumber
            | AttendanceError::InvalidName
            | AttendanceError::ClassClosed
            | AttendanceError::InvalidToggleValue
            | AttendanceError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AttendanceError::DuplicateRollNumber | AttendanceError::DuplicateIp => {
                StatusCode::CONFLICT
            }
            AttendanceError::RecordNotFound => StatusCode::NOT_FOUND,
            AttendanceError::SheetSync(_) => StatusCode::BAD_GATEWAY,
            AttendanceError::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string()
        }))
    }
}

fn rejected_payload<E>(err: E) -> actix_web::Error
where
    E: std::fmt::Display + std::fmt::Debug + 'static,
{
    let body = HttpResponse::BadRequest().json(json!({
        "success": false,
        "message": err.to_string()
    }));
    InternalError::from_response(err, body).into()
}

/// Body extractor failures use the same JSON envelope as handler errors.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    rejected_payload(err)
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    rejected_payload(err)
}
