use std::sync::Arc;

use rivulet::core::env::app_env::AppEnv;
use rivulet::features::directory::repository::RoomRepositoryImpl;
use rivulet::features::directory::service::{DirectoryService, DirectoryServiceImpl};
use rivulet::{DataAccess, RestBackend};

/// Smoke entrypoint: dumps the active-room directory of the configured
/// backend.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt().init();

    let env = AppEnv::new();
    let backend: Arc<dyn DataAccess> = Arc::new(RestBackend::from_env(&env));
    let directory = DirectoryServiceImpl::new(RoomRepositoryImpl::new(backend));

    let rooms = directory.list_active_rooms().await?;
    for overview in &rooms {
        println!(
            "{:<10} {:<30} {}/{}",
            overview.room.code, overview.room.name, overview.participant_count, overview.room.capacity
        );
    }
    tracing::info!(count = rooms.len(), "active rooms listed");

    Ok(())
}
