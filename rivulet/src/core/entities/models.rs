use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum RoomStatus {
    Active = 0,
    Inactive = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum MessageKind {
    Text = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum UserRole {
    Member = 0,
    Admin = 1,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Short join code, stored uppercase. Unique among active rooms.
    pub code: String,
    /// bcrypt hash when the room is password-protected. Never the plaintext.
    pub password: Option<String>,
    pub capacity: i32,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn is_protected(&self) -> bool {
        self.password.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRoom {
    pub name: String,
    pub description: Option<String>,
    pub code: String,
    pub password: Option<String>,
    pub capacity: i32,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

/// One (room, user) participation row. At most one active row per pair:
/// joining again upserts on (room_id, user_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMembership {
    pub room_id: String,
    pub user_id: String,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Immutable once created; transcript order is creation-time order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub author_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub room_id: String,
    pub author_id: String,
    pub body: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub verified: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub const ANONYMOUS_NAME: &'static str = "Anonymous";

    /// Placeholder used wherever a profile row is missing or unreadable.
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: Self::ANONYMOUS_NAME.to_string(),
            avatar: None,
            verified: false,
            role: UserRole::Member,
            created_at: DateTime::UNIX_EPOCH,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureImage {
    pub id: String,
    pub user_id: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureAudio {
    pub id: String,
    pub user_id: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureLocation {
    pub id: String,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub created_at: DateTime<Utc>,
}
