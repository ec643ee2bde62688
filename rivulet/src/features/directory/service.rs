use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tracing::{info, warn};
use validator::Validate;

use crate::core::dtos::room::create_room_dto::CreateRoomDto;
use crate::core::entities::models::{NewRoom, Room, RoomStatus};
use crate::core::types::errors::directory_error::DirectoryError;
use crate::core::types::responses::room_overview::RoomOverview;
use crate::core::utils::bcrypt_utils::{hash_password, verify_password};
use crate::core::utils::id_utils::{canonical_join_code, generate_join_code};

use super::repository::RoomRepository;

#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Read-only listing of active rooms, newest first, with live
    /// participant counts. Safe to call repeatedly.
    async fn list_active_rooms(&self) -> Result<Vec<RoomOverview>, DirectoryError>;

    async fn create_room(&self, data: CreateRoomDto) -> Result<Room, DirectoryError>;

    /// The join gate: code lookup, password check, capacity check, in that
    /// order. Success returns the room for the caller to enter; the
    /// check-then-join race is accepted as best-effort.
    async fn resolve_join(
        &self,
        join_code: &str,
        password: Option<&str>,
    ) -> Result<Room, DirectoryError>;

    /// Rooms are never deleted, only deactivated.
    async fn deactivate_room(&self, room_id: &str) -> Result<Room, DirectoryError>;
}

#[derive(Clone)]
pub struct DirectoryServiceImpl<R: RoomRepository> {
    room_repository: R,
}

impl<R: RoomRepository> DirectoryServiceImpl<R> {
    pub fn new(room_repository: R) -> Self {
        Self { room_repository }
    }

    async fn generate_unique_join_code(
        &self,
        max_attempts: usize,
    ) -> Result<String, DirectoryError> {
        for _ in 0..max_attempts {
            let code = generate_join_code();
            if !self.room_repository.exists_code(&code).await? {
                return Ok(code);
            }
        }

        Err(DirectoryError::Unexpected(
            "Failed to generate unique join code".into(),
        ))
    }
}

#[async_trait]
impl<R: RoomRepository> DirectoryService for DirectoryServiceImpl<R> {
    async fn list_active_rooms(&self) -> Result<Vec<RoomOverview>, DirectoryError> {
        let rooms = self.room_repository.list_active_rooms().await?;

        let counts = join_all(
            rooms
                .iter()
                .map(|room| self.room_repository.count_active_memberships(&room.id)),
        )
        .await;

        let overviews = rooms
            .into_iter()
            .zip(counts)
            .map(|(room, count)| {
                let participant_count = count.unwrap_or_else(|err| {
                    warn!(room_id = %room.id, "participant count failed: {err}");
                    0
                });
                RoomOverview {
                    room,
                    participant_count,
                }
            })
            .collect();

        Ok(overviews)
    }

    async fn create_room(&self, data: CreateRoomDto) -> Result<Room, DirectoryError> {
        data.validate()
            .map_err(|err| DirectoryError::Validation(err.to_string()))?;

        let code = self.generate_unique_join_code(10).await?;
        let password = data
            .password
            .as_deref()
            .filter(|password| !password.is_empty())
            .map(hash_password);

        let new_room = NewRoom {
            name: data.name,
            description: data.description,
            code,
            password,
            capacity: data.capacity,
            status: RoomStatus::Active,
            created_at: Utc::now(),
        };

        let room = self.room_repository.create_room(new_room).await?;
        info!(room_id = %room.id, code = %room.code, "room created");
        Ok(room)
    }

    async fn resolve_join(
        &self,
        join_code: &str,
        password: Option<&str>,
    ) -> Result<Room, DirectoryError> {
        let code = canonical_join_code(join_code);

        let room = self
            .room_repository
            .get_active_room_by_code(&code)
            .await?
            .ok_or_else(|| DirectoryError::RoomCodeNotFound(code.clone()))?;

        if let Some(hash) = room.password.as_deref() {
            let password = password
                .map(str::trim)
                .filter(|password| !password.is_empty())
                .ok_or(DirectoryError::PasswordRequired)?;

            if !verify_password(password, hash) {
                return Err(DirectoryError::PasswordMismatch);
            }
        }

        // The count is re-fetched at resolution time, not taken from a
        // cached listing.
        let count = self
            .room_repository
            .count_active_memberships(&room.id)
            .await?;
        if count >= room.capacity as usize {
            return Err(DirectoryError::RoomFull {
                capacity: room.capacity,
            });
        }

        Ok(room)
    }

    async fn deactivate_room(&self, room_id: &str) -> Result<Room, DirectoryError> {
        let mut room = self
            .room_repository
            .get_room_by_id(room_id)
            .await?
            .ok_or_else(|| DirectoryError::RoomNotFound(room_id.to_string()))?;

        room.status = RoomStatus::Inactive;
        let room = self.room_repository.update_room(room).await?;

        info!(room_id = %room.id, "room deactivated");
        Ok(room)
    }
}
