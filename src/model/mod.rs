pub mod app_state;
pub mod attendance;
pub mod leave_count;
