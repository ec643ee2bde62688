use async_channel::Receiver;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::core::types::errors::backend_error::BackendError;

use super::query::{Filter, Query};

/// Rows cross the collaborator boundary as plain JSON values; the typed
/// entities are encoded and decoded at the repository layer.
pub type Row = Value;

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, BackendError> {
    serde_json::to_value(value).map_err(Into::into)
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, BackendError> {
    serde_json::from_value(row).map_err(Into::into)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, BackendError> {
    rows.into_iter().map(from_row).collect()
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One change-feed notification: a row matching the subscription's filters
/// was inserted, updated or deleted.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: String,
    pub op: ChangeOp,
    pub row: Row,
}

pub type SubscriptionId = u64;

/// Live change feed for one (table, filters) pair. Must be released with
/// [`DataAccess::unsubscribe`] when the owner goes away.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: Receiver<ChangeEvent>,
}

/// The hosted backend-as-a-service collaborator: session auth, record CRUD
/// with filter/order/limit, change subscriptions and object storage.
#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// Provider sign-in via id-token exchange.
    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<AuthSession, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, BackendError>;

    /// Returns the stored row, including backend-issued fields.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError>;

    /// Inserts, or merges into the row matching `conflict_columns`.
    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict_columns: &[&str],
    ) -> Result<Row, BackendError>;

    async fn subscribe(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> Result<Subscription, BackendError>;

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BackendError>;

    /// Stores an object and returns its path within the bucket.
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError>;

    fn get_public_url(&self, bucket: &str, path: &str) -> String;
}
