use serde_json::Value;
use tracing::info;

use crate::error::AttendanceError;
use crate::model::app_state::{TogglePatch, ToggleState};
use crate::store::ToggleStore;

pub async fn get<S: ToggleStore>(store: &S) -> Result<ToggleState, AttendanceError> {
    store.load_toggles().await
}

pub async fn set_attendance<S: ToggleStore>(
    store: &S,
    open: bool,
) -> Result<ToggleState, AttendanceError> {
    let state = store.apply_toggle(TogglePatch::Attendance(open)).await?;
    info!(toggle_attendance = open, "Attendance toggle updated");
    Ok(state)
}

pub async fn set_input<S: ToggleStore>(
    store: &S,
    visible: bool,
) -> Result<ToggleState, AttendanceError> {
    let state = store.apply_toggle(TogglePatch::Input(visible)).await?;
    info!(toggle_input = visible, "Input toggle updated");
    Ok(state)
}

pub async fn set_note<S: ToggleStore>(
    store: &S,
    note: String,
) -> Result<ToggleState, AttendanceError> {
    let state = store.apply_toggle(TogglePatch::Note(note)).await?;
    info!(note_len = state.note.len(), "Note updated");
    Ok(state)
}

/// Stops accepting submissions for the current session.
pub async fn close_attendance<S: ToggleStore>(store: &S) -> Result<ToggleState, AttendanceError> {
    set_attendance(store, false).await
}

/// `{"state": <bool>}`; anything else is rejected.
pub fn parse_state(payload: &Value) -> Result<bool, AttendanceError> {
    payload
        .get("state")
        .and_then(Value::as_bool)
        .ok_or(AttendanceError::InvalidToggleValue)
}

/// `{"note": <string>}`; anything else is rejected.
pub fn parse_note(payload: &Value) -> Result<String, AttendanceError> {
    payload
        .get("note")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(AttendanceError::InvalidToggleValue)
}
