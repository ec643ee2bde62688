#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rivulet::backend::client::{AuthSession, DataAccess, from_row, to_row};
use rivulet::core::entities::models::{
    Message, MessageKind, NewMessage, NewRoom, Room, RoomStatus, UserProfile, UserRole,
};
use rivulet::core::utils::bcrypt_utils::hash_password;
use rivulet::features::admin::repository::CaptureRepositoryImpl;
use rivulet::features::admin::service::AdminServiceImpl;
use rivulet::features::auth::service::AuthServiceImpl;
use rivulet::features::directory::repository::{ROOMS_TABLE, RoomRepositoryImpl};
use rivulet::features::directory::service::DirectoryServiceImpl;
use rivulet::features::session::repository::{ChatRepositoryImpl, MESSAGES_TABLE};
use rivulet::features::session::service::RoomSessionManager;
use rivulet::features::user::repository::{PROFILES_TABLE, UserRepositoryImpl};
use rivulet::InMemoryBackend;

pub type Auth = AuthServiceImpl<UserRepositoryImpl>;
pub type Directory = DirectoryServiceImpl<RoomRepositoryImpl>;
pub type Sessions =
    RoomSessionManager<ChatRepositoryImpl, RoomRepositoryImpl, UserRepositoryImpl, Auth>;
pub type Admin = AdminServiceImpl<Auth, CaptureRepositoryImpl, UserRepositoryImpl>;

pub const CAPTURE_BUCKET: &str = "captures";

pub struct TestApp {
    pub backend: Arc<InMemoryBackend>,
    pub data: Arc<dyn DataAccess>,
    pub auth: Auth,
    pub directory: Directory,
    pub sessions: Sessions,
    pub admin: Admin,
}

pub fn test_app() -> TestApp {
    let backend = Arc::new(InMemoryBackend::new());
    let data: Arc<dyn DataAccess> = backend.clone();

    let room_repository = RoomRepositoryImpl::new(data.clone());
    let user_repository = UserRepositoryImpl::new(data.clone());
    let chat_repository = ChatRepositoryImpl::new(data.clone());
    let capture_repository = CaptureRepositoryImpl::new(data.clone());

    let auth = AuthServiceImpl::new(data.clone(), user_repository.clone());
    let directory = DirectoryServiceImpl::new(room_repository.clone());
    let sessions = RoomSessionManager::new(
        data.clone(),
        chat_repository,
        room_repository,
        user_repository.clone(),
        auth.clone(),
    );
    let admin = AdminServiceImpl::new(
        data.clone(),
        auth.clone(),
        capture_repository,
        user_repository,
        CAPTURE_BUCKET.to_string(),
    );

    TestApp {
        backend,
        data,
        auth,
        directory,
        sessions,
        admin,
    }
}

impl TestApp {
    /// Creates a profile row and makes it the current authenticated user.
    pub async fn sign_in_as(&self, name: &str, role: UserRole) -> UserProfile {
        let profile = UserProfile {
            user_id: Uuid::new_v4().to_string(),
            display_name: name.to_string(),
            avatar: None,
            verified: false,
            role,
            created_at: Utc::now(),
        };

        self.data
            .upsert(PROFILES_TABLE, to_row(&profile).unwrap(), &["user_id"])
            .await
            .unwrap();
        self.backend.set_session(Some(AuthSession {
            user_id: profile.user_id.clone(),
            email: Some(format!("{name}@example.com")),
        }));

        profile
    }

    /// Authenticates a user id that has no profile row.
    pub fn sign_in_without_profile(&self, user_id: &str) {
        self.backend.set_session(Some(AuthSession {
            user_id: user_id.to_string(),
            email: None,
        }));
    }

    pub fn sign_out(&self) {
        self.backend.set_session(None);
    }

    pub async fn seed_room(
        &self,
        name: &str,
        code: &str,
        capacity: i32,
        password: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Room {
        let new_room = NewRoom {
            name: name.to_string(),
            description: None,
            code: code.to_string(),
            password: password.map(hash_password),
            capacity,
            status: RoomStatus::Active,
            created_at,
        };

        let row = self
            .data
            .insert(ROOMS_TABLE, to_row(&new_room).unwrap())
            .await
            .unwrap();
        from_row(row).unwrap()
    }

    pub async fn seed_message(
        &self,
        room_id: &str,
        author_id: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Message {
        let message = NewMessage {
            room_id: room_id.to_string(),
            author_id: author_id.to_string(),
            body: body.to_string(),
            kind: MessageKind::Text,
            created_at,
        };

        let row = self
            .data
            .insert(MESSAGES_TABLE, to_row(&message).unwrap())
            .await
            .unwrap();
        from_row(row).unwrap()
    }

    pub fn message_rows(&self) -> usize {
        self.backend.rows(MESSAGES_TABLE).len()
    }
}

/// Polls `condition` until it holds or a two second deadline passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
