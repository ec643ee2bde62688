mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;

use common::{CAPTURE_BUCKET, test_app};
use rivulet::backend::client::{
    AuthSession, DataAccess, Row, Subscription, SubscriptionId,
};
use rivulet::backend::query::{Filter, Query};
use rivulet::core::entities::models::UserRole;
use rivulet::core::types::errors::admin_error::AdminError;
use rivulet::core::types::errors::backend_error::BackendError;
use rivulet::features::admin::repository::{
    AUDIO_CAPTURE_LIMIT, CAPTURE_AUDIO_TABLE, CAPTURE_IMAGES_TABLE, CAPTURE_LOCATIONS_TABLE,
    CaptureRepositoryImpl,
};
use rivulet::features::admin::service::{AdminService, AdminServiceImpl, PLACEHOLDER_EMAIL};
use rivulet::features::auth::service::AuthServiceImpl;
use rivulet::features::user::repository::UserRepositoryImpl;
use rivulet::InMemoryBackend;

async fn seed_audio(app: &common::TestApp, user_id: &str, count: usize) {
    let base = Utc::now() - Duration::hours(1);
    for i in 0..count {
        app.data
            .insert(
                CAPTURE_AUDIO_TABLE,
                json!({
                    "user_id": user_id,
                    "storage_path": format!("{user_id}/audio-{i}.ogg"),
                    "created_at": (base + Duration::seconds(i as i64)).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
    }
}

async fn seed_locations(app: &common::TestApp, user_id: &str, count: usize) {
    let base = Utc::now() - Duration::hours(1);
    for i in 0..count {
        app.data
            .insert(
                CAPTURE_LOCATIONS_TABLE,
                json!({
                    "user_id": user_id,
                    "latitude": 52.0 + i as f64,
                    "longitude": 4.0,
                    "accuracy": 12.5,
                    "created_at": (base + Duration::seconds(i as i64)).to_rfc3339(),
                }),
            )
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn members_and_anonymous_callers_are_denied() {
    let app = test_app();

    let err = app.admin.list_users().await.unwrap_err();
    assert!(matches!(err, AdminError::NotPermitted));

    app.sign_in_as("mallory", UserRole::Member).await;
    let err = app.admin.list_users().await.unwrap_err();
    assert!(matches!(err, AdminError::NotPermitted));

    let err = app.admin.load_capture_data("anyone").await.unwrap_err();
    assert!(matches!(err, AdminError::NotPermitted));
}

#[tokio::test]
async fn list_users_is_newest_first_with_placeholder_emails() {
    let app = test_app();

    let old = app.sign_in_as("old-timer", UserRole::Member).await;
    let new = app.sign_in_as("newcomer", UserRole::Member).await;
    let admin = app.sign_in_as("root", UserRole::Admin).await;

    let users = app.admin.list_users().await.unwrap();
    assert_eq!(users.len(), 3);

    let ids: Vec<_> = users.iter().map(|u| u.profile.user_id.clone()).collect();
    assert_eq!(ids, vec![admin.user_id, new.user_id, old.user_id]);
    assert!(users.iter().all(|u| u.email == PLACEHOLDER_EMAIL));
}

#[tokio::test]
async fn capture_report_tolerates_empty_categories() {
    let app = test_app();
    app.sign_in_as("root", UserRole::Admin).await;

    seed_audio(&app, "target", 5).await;
    seed_locations(&app, "target", 3).await;

    let report = app.admin.load_capture_data("target").await.unwrap();
    assert!(report.images.is_empty());
    assert_eq!(report.audio.len(), 5);
    assert_eq!(report.locations.len(), 3);

    for view in &report.audio {
        assert!(view.url.contains(CAPTURE_BUCKET));
        assert!(view.url.ends_with(&view.record.storage_path));
    }
}

#[tokio::test]
async fn capture_report_caps_each_category() {
    let app = test_app();
    app.sign_in_as("root", UserRole::Admin).await;

    seed_audio(&app, "target", AUDIO_CAPTURE_LIMIT + 5).await;

    let report = app.admin.load_capture_data("target").await.unwrap();
    assert_eq!(report.audio.len(), AUDIO_CAPTURE_LIMIT);
    // Newest first.
    assert!(
        report.audio[0]
            .record
            .storage_path
            .ends_with(&format!("audio-{}.ogg", AUDIO_CAPTURE_LIMIT + 4))
    );
}

/// Delegates everything to the wrapped backend, except selects on one table
/// which always fail.
struct FailingTable {
    inner: Arc<InMemoryBackend>,
    table: String,
}

#[async_trait]
impl DataAccess for FailingTable {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        self.inner.get_session().await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<AuthSession, BackendError> {
        self.inner.sign_in_with_provider(provider, id_token).await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.inner.sign_out().await
    }

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, BackendError> {
        if table == self.table {
            return Err(BackendError::Request("induced failure".to_string()));
        }
        self.inner.select(table, query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        self.inner.insert(table, row).await
    }

    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict_columns: &[&str],
    ) -> Result<Row, BackendError> {
        self.inner.upsert(table, row, conflict_columns).await
    }

    async fn subscribe(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> Result<Subscription, BackendError> {
        self.inner.subscribe(table, filters).await
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BackendError> {
        self.inner.unsubscribe(subscription).await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        self.inner.upload_object(bucket, key, bytes).await
    }

    fn get_public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.get_public_url(bucket, path)
    }
}

#[tokio::test]
async fn a_failing_category_never_blocks_the_others() {
    let app = test_app();
    app.sign_in_as("root", UserRole::Admin).await;

    seed_audio(&app, "target", 2).await;
    seed_locations(&app, "target", 4).await;

    let failing: Arc<dyn DataAccess> = Arc::new(FailingTable {
        inner: app.backend.clone(),
        table: CAPTURE_IMAGES_TABLE.to_string(),
    });

    let user_repository = UserRepositoryImpl::new(failing.clone());
    let admin = AdminServiceImpl::new(
        failing.clone(),
        AuthServiceImpl::new(failing.clone(), user_repository.clone()),
        CaptureRepositoryImpl::new(failing),
        user_repository,
        CAPTURE_BUCKET.to_string(),
    );

    let report = admin.load_capture_data("target").await.unwrap();
    assert!(report.images.is_empty());
    assert_eq!(report.audio.len(), 2);
    assert_eq!(report.locations.len(), 4);
}
