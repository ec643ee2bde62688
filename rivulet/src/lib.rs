//! rivulet: the client-side workflow of a realtime chat product layered on a
//! hosted backend-as-a-service. Room directory (create / list / join
//! admission), live room sessions (history plus change-feed driven
//! transcript and roster), and a role-gated admin monitor, all behind the
//! backend-agnostic [`DataAccess`] collaborator.

pub mod backend;
pub mod core;
pub mod features;

pub use crate::backend::client::{
    AuthSession, ChangeEvent, ChangeOp, DataAccess, Row, Subscription, SubscriptionId,
};
pub use crate::backend::memory::InMemoryBackend;
pub use crate::backend::query::{Filter, Query};
pub use crate::backend::rest::RestBackend;
pub use crate::core::entities::models::{
    Membership, Message, Room, RoomStatus, UserProfile, UserRole,
};
pub use crate::core::env::app_env::AppEnv;
pub use crate::core::types::events::{SessionChannel, SessionEvent};
pub use crate::features::admin::service::{AdminService, AdminServiceImpl};
pub use crate::features::auth::service::{AuthService, AuthServiceImpl};
pub use crate::features::directory::service::{DirectoryService, DirectoryServiceImpl};
pub use crate::features::session::service::{RoomSession, RoomSessionManager, SessionState};
pub use crate::features::user::service::{UserService, UserServiceImpl};
