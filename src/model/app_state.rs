use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const GLOBAL_IDENTIFIER: &str = "global";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleState {
    /// Whether new submissions are accepted ("class is in session").
    #[schema(example = true)]
    pub toggle_attendance: bool,

    /// Whether the optional free-text field is shown and stored.
    #[schema(example = false)]
    pub toggle_input: bool,

    #[schema(example = "Bring your lab notebook")]
    pub note: String,
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            toggle_attendance: true,
            toggle_input: false,
            note: String::new(),
        }
    }
}

/// A single-field change to the global toggle row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TogglePatch {
    Attendance(bool),
    Input(bool),
    Note(String),
}
