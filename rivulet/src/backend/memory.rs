use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_channel::Sender;
use async_trait::async_trait;
use chrono::DateTime;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::core::types::errors::backend_error::BackendError;

use super::client::{
    AuthSession, ChangeEvent, ChangeOp, DataAccess, Row, Subscription, SubscriptionId,
};
use super::query::{Filter, Query, filters_match};

struct SubscriptionEntry {
    table: String,
    filters: Vec<Filter>,
    tx: Sender<ChangeEvent>,
}

/// Fully in-process implementation of the collaborator. Backs the test
/// suites and local experimentation; tables are JSON rows keyed by a
/// backend-issued uuid `id`.
pub struct InMemoryBackend {
    tables: DashMap<String, Vec<Row>>,
    subscriptions: DashMap<SubscriptionId, SubscriptionEntry>,
    objects: DashMap<String, Vec<u8>>,
    credentials: DashMap<String, (String, String)>,
    provider_identities: DashMap<String, String>,
    session: RwLock<Option<AuthSession>>,
    next_subscription: AtomicU64,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            subscriptions: DashMap::new(),
            objects: DashMap::new(),
            credentials: DashMap::new(),
            provider_identities: DashMap::new(),
            session: RwLock::new(None),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Registers password credentials and returns the issued user id.
    pub fn seed_user(&self, email: &str, password: &str) -> String {
        let user_id = Uuid::new_v4().to_string();
        self.credentials
            .insert(email.to_string(), (password.to_string(), user_id.clone()));
        user_id
    }

    /// Swaps the current auth session. Lets tests act as several users
    /// against one backend.
    pub fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write() = session;
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn fan_out(&self, table: &str, op: ChangeOp, row: &Row) {
        let mut closed = Vec::new();

        for entry in self.subscriptions.iter() {
            let sub = entry.value();
            if sub.table != table || !filters_match(&sub.filters, row) {
                continue;
            }
            let event = ChangeEvent {
                table: table.to_string(),
                op,
                row: row.clone(),
            };
            if sub.tx.try_send(event).is_err() {
                closed.push(*entry.key());
            }
        }

        for id in closed {
            debug!(subscription = id, "dropping closed subscription");
            self.subscriptions.remove(&id);
        }
    }
}

/// Column comparison for order-by: timestamps, then numbers, then strings.
fn cmp_values(a: &Value, b: &Value) -> Ordering {
    if let (Value::String(a), Value::String(b)) = (a, b) {
        if let (Ok(a), Ok(b)) = (
            DateTime::parse_from_rfc3339(a),
            DateTime::parse_from_rfc3339(b),
        ) {
            return a.cmp(&b);
        }
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a
            .as_str()
            .unwrap_or_default()
            .cmp(b.as_str().unwrap_or_default()),
    }
}

#[async_trait]
impl DataAccess for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        Ok(self.session.read().clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let (stored, user_id) = self
            .credentials
            .get(email)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BackendError::Auth("invalid login credentials".to_string()))?;

        if stored != password {
            return Err(BackendError::Auth("invalid login credentials".to_string()));
        }

        let session = AuthSession {
            user_id,
            email: Some(email.to_string()),
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<AuthSession, BackendError> {
        let identity = format!("{provider}:{id_token}");
        let user_id = self
            .provider_identities
            .entry(identity)
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        let session = AuthSession {
            user_id,
            email: None,
        };
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.set_session(None);
        Ok(())
    }

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, BackendError> {
        let mut rows: Vec<Row> = self
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = cmp_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, BackendError> {
        let object = row
            .as_object_mut()
            .ok_or_else(|| BackendError::Request("row must be a JSON object".to_string()))?;

        if !object.contains_key("id") {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        self.fan_out(table, ChangeOp::Insert, &row);
        Ok(row)
    }

    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict_columns: &[&str],
    ) -> Result<Row, BackendError> {
        let incoming = row
            .as_object()
            .ok_or_else(|| BackendError::Request("row must be a JSON object".to_string()))?
            .clone();

        let existing = {
            let mut rows = self.tables.entry(table.to_string()).or_default();
            let found = rows.iter_mut().find(|candidate| {
                conflict_columns
                    .iter()
                    .all(|column| candidate.get(*column) == incoming.get(*column))
            });

            match found {
                Some(stored) => {
                    let merged = stored
                        .as_object_mut()
                        .expect("stored rows are always objects");
                    for (key, value) in incoming {
                        merged.insert(key, value);
                    }
                    Some(stored.clone())
                }
                None => None,
            }
        };

        match existing {
            Some(updated) => {
                self.fan_out(table, ChangeOp::Update, &updated);
                Ok(updated)
            }
            None => self.insert(table, row).await,
        }
    }

    async fn subscribe(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> Result<Subscription, BackendError> {
        let id = self.next_subscription.fetch_add(1, AtomicOrdering::Relaxed);
        let (tx, events) = async_channel::unbounded();

        self.subscriptions.insert(
            id,
            SubscriptionEntry {
                table: table.to_string(),
                filters,
                tx,
            },
        );

        Ok(Subscription { id, events })
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BackendError> {
        self.subscriptions.remove(&subscription);
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        self.objects.insert(format!("{bucket}/{key}"), bytes);
        Ok(key.to_string())
    }

    fn get_public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://storage/{bucket}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_issues_an_id() {
        let backend = InMemoryBackend::new();
        let row = backend
            .insert("rooms", json!({"name": "standup"}))
            .await
            .unwrap();
        assert!(row.get("id").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_columns() {
        let backend = InMemoryBackend::new();
        backend
            .upsert(
                "memberships",
                json!({"room_id": "r1", "user_id": "u1", "active": true}),
                &["room_id", "user_id"],
            )
            .await
            .unwrap();
        backend
            .upsert(
                "memberships",
                json!({"room_id": "r1", "user_id": "u1", "active": false}),
                &["room_id", "user_id"],
            )
            .await
            .unwrap();

        let rows = backend.rows("memberships");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["active"], json!(false));
    }

    #[tokio::test]
    async fn select_orders_and_limits() {
        let backend = InMemoryBackend::new();
        for (body, at) in [
            ("first", "2026-01-01T00:00:00Z"),
            ("third", "2026-01-03T00:00:00Z"),
            ("second", "2026-01-02T00:00:00.500Z"),
        ] {
            backend
                .insert("messages", json!({"body": body, "created_at": at}))
                .await
                .unwrap();
        }

        let rows = backend
            .select(
                "messages",
                Query::new().order_desc("created_at").limit(2),
            )
            .await
            .unwrap();
        let bodies: Vec<_> = rows.iter().map(|r| r["body"].as_str().unwrap()).collect();
        assert_eq!(bodies, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn subscription_sees_only_matching_rows() {
        let backend = InMemoryBackend::new();
        let sub = backend
            .subscribe("messages", vec![Filter::eq("room_id", "r1")])
            .await
            .unwrap();

        backend
            .insert("messages", json!({"room_id": "r2", "body": "elsewhere"}))
            .await
            .unwrap();
        backend
            .insert("messages", json!({"room_id": "r1", "body": "here"}))
            .await
            .unwrap();

        let event = sub.events.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Insert);
        assert_eq!(event.row["body"], json!("here"));
        assert!(sub.events.is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_feed() {
        let backend = InMemoryBackend::new();
        let sub = backend.subscribe("messages", Vec::new()).await.unwrap();
        backend.unsubscribe(sub.id).await.unwrap();

        backend
            .insert("messages", json!({"body": "late"}))
            .await
            .unwrap();
        assert!(sub.events.recv().await.is_err());
        assert_eq!(backend.subscription_count(), 0);
    }

    #[tokio::test]
    async fn password_sign_in_round_trip() {
        let backend = InMemoryBackend::new();
        let user_id = backend.seed_user("ada@example.com", "hunter2");

        assert!(
            backend
                .sign_in_with_password("ada@example.com", "nope")
                .await
                .is_err()
        );

        let session = backend
            .sign_in_with_password("ada@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);

        backend.sign_out().await.unwrap();
        assert!(backend.get_session().await.unwrap().is_none());
    }
}
