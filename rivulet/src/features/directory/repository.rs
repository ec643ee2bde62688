use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::client::{DataAccess, from_row, from_rows, to_row};
use crate::backend::query::Query;
use crate::core::entities::models::{Membership, NewMembership, NewRoom, Room, RoomStatus};
use crate::core::types::errors::backend_error::BackendError;

pub const ROOMS_TABLE: &str = "rooms";
pub const MEMBERSHIPS_TABLE: &str = "memberships";

#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Active rooms, newest first.
    async fn list_active_rooms(&self) -> Result<Vec<Room>, BackendError>;

    /// Lookup by canonical (uppercase) join code, restricted to active rooms.
    async fn get_active_room_by_code(&self, code: &str) -> Result<Option<Room>, BackendError>;

    async fn get_room_by_id(&self, room_id: &str) -> Result<Option<Room>, BackendError>;

    async fn exists_code(&self, code: &str) -> Result<bool, BackendError>;

    async fn create_room(&self, room: NewRoom) -> Result<Room, BackendError>;

    async fn update_room(&self, room: Room) -> Result<Room, BackendError>;

    /// Idempotent on (room_id, user_id): re-joining refreshes the existing
    /// row instead of duplicating it.
    async fn upsert_membership(&self, membership: NewMembership)
    -> Result<Membership, BackendError>;

    async fn active_memberships(&self, room_id: &str) -> Result<Vec<Membership>, BackendError>;

    async fn count_active_memberships(&self, room_id: &str) -> Result<usize, BackendError> {
        Ok(self.active_memberships(room_id).await?.len())
    }
}

#[derive(Clone)]
pub struct RoomRepositoryImpl {
    backend: Arc<dyn DataAccess>,
}

impl RoomRepositoryImpl {
    pub fn new(backend: Arc<dyn DataAccess>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RoomRepository for RoomRepositoryImpl {
    async fn list_active_rooms(&self) -> Result<Vec<Room>, BackendError> {
        let rows = self
            .backend
            .select(
                ROOMS_TABLE,
                Query::new()
                    .eq("status", RoomStatus::Active as i32)
                    .order_desc("created_at"),
            )
            .await?;

        from_rows(rows)
    }

    async fn get_active_room_by_code(&self, code: &str) -> Result<Option<Room>, BackendError> {
        let rows = self
            .backend
            .select(
                ROOMS_TABLE,
                Query::new()
                    .eq("code", code)
                    .eq("status", RoomStatus::Active as i32)
                    .limit(1),
            )
            .await?;

        rows.into_iter().next().map(from_row).transpose()
    }

    async fn get_room_by_id(&self, room_id: &str) -> Result<Option<Room>, BackendError> {
        let rows = self
            .backend
            .select(ROOMS_TABLE, Query::new().eq("id", room_id).limit(1))
            .await?;

        rows.into_iter().next().map(from_row).transpose()
    }

    async fn exists_code(&self, code: &str) -> Result<bool, BackendError> {
        let rows = self
            .backend
            .select(ROOMS_TABLE, Query::new().eq("code", code).limit(1))
            .await?;

        Ok(!rows.is_empty())
    }

    async fn create_room(&self, room: NewRoom) -> Result<Room, BackendError> {
        let row = self.backend.insert(ROOMS_TABLE, to_row(&room)?).await?;
        from_row(row)
    }

    async fn update_room(&self, room: Room) -> Result<Room, BackendError> {
        let row = self
            .backend
            .upsert(ROOMS_TABLE, to_row(&room)?, &["id"])
            .await?;
        from_row(row)
    }

    async fn upsert_membership(
        &self,
        membership: NewMembership,
    ) -> Result<Membership, BackendError> {
        let row = self
            .backend
            .upsert(
                MEMBERSHIPS_TABLE,
                to_row(&membership)?,
                &["room_id", "user_id"],
            )
            .await?;

        from_row(row)
    }

    async fn active_memberships(&self, room_id: &str) -> Result<Vec<Membership>, BackendError> {
        let rows = self
            .backend
            .select(
                MEMBERSHIPS_TABLE,
                Query::new().eq("room_id", room_id).eq("active", true),
            )
            .await?;

        from_rows(rows)
    }
}
