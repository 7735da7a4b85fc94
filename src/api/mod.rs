pub mod attendance;
pub mod leave_count;
pub mod toggle;
