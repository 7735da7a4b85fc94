pub mod client_ip;
pub mod clock;
pub mod list_view;
pub mod validation;
