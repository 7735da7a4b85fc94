use actix_web::{HttpResponse, Responder, web};
use serde_json::{Value, json};
use sqlx::MySqlPool;

use crate::toggle;

#[utoipa::path(
    get,
    path = "/api/toggle",
    responses(
        (status = 200, description = "Current toggle state", body = ToggleState),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn get_toggles(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let state = toggle::get(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": state })))
}

/// Whether the optional answer field is shown
#[utoipa::path(
    get,
    path = "/api/toggle/input",
    responses(
        (status = 200, description = "Input toggle", body = Object, example = json!({ "state": false })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn get_input(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let state = toggle::get(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "state": state.toggle_input })))
}

#[utoipa::path(
    post,
    path = "/api/toggle/input",
    request_body(content = Object, example = json!({ "state": true })),
    responses(
        (status = 200, description = "Input toggle updated", body = Object, example = json!({
            "success": true,
            "state": true
        })),
        (status = 400, description = "State is not a boolean"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn set_input(
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let visible = toggle::parse_state(&payload)?;
    let state = toggle::set_input(pool.get_ref(), visible).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "state": state.toggle_input })))
}

/// Whether submissions are accepted
#[utoipa::path(
    get,
    path = "/api/toggle/attendance",
    responses(
        (status = 200, description = "Attendance toggle", body = Object, example = json!({ "state": true })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn get_attendance(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let state = toggle::get(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "state": state.toggle_attendance })))
}

#[utoipa::path(
    post,
    path = "/api/toggle/attendance",
    request_body(content = Object, example = json!({ "state": false })),
    responses(
        (status = 200, description = "Attendance toggle updated", body = Object, example = json!({
            "success": true,
            "state": false
        })),
        (status = 400, description = "State is not a boolean"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn set_attendance(
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let open = toggle::parse_state(&payload)?;
    let state = toggle::set_attendance(pool.get_ref(), open).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "state": state.toggle_attendance })))
}

#[utoipa::path(
    get,
    path = "/api/toggle/get-note",
    responses(
        (status = 200, description = "Note shown on the form", body = Object, example = json!({
            "note": "Bring your lab notebook"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn get_note(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let state = toggle::get(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "note": state.note })))
}

#[utoipa::path(
    post,
    path = "/api/toggle/set-note",
    request_body(content = Object, example = json!({ "note": "Quiz on Friday" })),
    responses(
        (status = 200, description = "Note updated", body = Object, example = json!({
            "success": true,
            "note": "Quiz on Friday"
        })),
        (status = 400, description = "Note is not a string"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Toggle"
)]
pub async fn set_note(
    pool: web::Data<MySqlPool>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let note = toggle::parse_note(&payload)?;
    let state = toggle::set_note(pool.get_ref(), note).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "note": state.note })))
}
