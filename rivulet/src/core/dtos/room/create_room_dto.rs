use serde::{Deserialize, Serialize};
use validator_derive::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CreateRoomDto {
    #[validate(length(min = 1, message = "room name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
    pub password: Option<String>,
    #[validate(range(min = 2, message = "capacity must be at least 2"))]
    pub capacity: i32,
}
