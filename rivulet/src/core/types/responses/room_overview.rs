use serde::Serialize;

use crate::core::entities::models::Room;

/// One directory listing entry: the room plus its live participant count.
#[derive(Debug, Serialize, Clone)]
pub struct RoomOverview {
    #[serde(flatten)]
    pub room: Room,
    pub participant_count: usize,
}
