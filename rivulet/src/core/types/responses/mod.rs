pub mod admin_response;
pub mod room_overview;
pub mod transcript;
