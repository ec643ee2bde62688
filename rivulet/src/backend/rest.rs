use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_channel::Sender;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::env::app_env::AppEnv;
use crate::core::types::errors::backend_error::BackendError;

use super::client::{
    AuthSession, ChangeEvent, ChangeOp, DataAccess, Row, Subscription, SubscriptionId,
};
use super::query::{Filter, Query};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

struct AuthState {
    session: AuthSession,
    access_token: String,
}

struct RestShared {
    http: Client,
    base_url: String,
    api_key: String,
    auth: RwLock<Option<AuthState>>,
}

impl RestShared {
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self
            .auth
            .read()
            .as_ref()
            .map(|state| state.access_token.clone())
            .unwrap_or_else(|| self.api_key.clone());

        self.http
            .request(method, self.url(path))
            .header("apikey", self.api_key.clone())
            .bearer_auth(token)
    }

    async fn expect_success(res: Response) -> Result<Response, BackendError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(BackendError::Request(format!("{status}: {body}")))
    }

    async fn select_rows(&self, table: &str, query: &Query) -> Result<Vec<Row>, BackendError> {
        let res = self
            .request(Method::GET, &format!("/rest/v1/{table}"))
            .query(&query_params(query))
            .send()
            .await?;

        let rows = Self::expect_success(res).await?.json::<Vec<Row>>().await?;
        Ok(rows)
    }
}

fn render_filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|filter| {
            (
                filter.column.clone(),
                format!("eq.{}", render_filter_value(&filter.value)),
            )
        })
        .collect();

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// `DataAccess` over a hosted REST API: rows under `/rest/v1`, token auth
/// under `/auth/v1`, objects under `/storage/v1`. Change subscriptions are
/// driven by per-subscription polling tasks with explicit start/stop.
pub struct RestBackend {
    shared: Arc<RestShared>,
    poll_interval: Duration,
    subscriptions: DashMap<SubscriptionId, CancellationToken>,
    next_subscription: AtomicU64,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(RestShared {
                http: Client::new(),
                base_url: base_url.into(),
                api_key: api_key.into(),
                auth: RwLock::new(None),
            }),
            poll_interval,
            subscriptions: DashMap::new(),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn from_env(env: &AppEnv) -> Self {
        Self::new(
            env.backend_url.clone(),
            env.backend_api_key.clone(),
            Duration::from_millis(env.poll_interval_ms),
        )
    }

    async fn exchange_token(&self, grant: &str, body: Value) -> Result<AuthSession, BackendError> {
        let res = self
            .shared
            .request(Method::POST, &format!("/auth/v1/token?grant_type={grant}"))
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Auth(format!("{status}: {body}")));
        }

        let token = res.json::<TokenResponse>().await?;
        let session = AuthSession {
            user_id: token.user.id,
            email: token.user.email,
        };
        *self.shared.auth.write() = Some(AuthState {
            session: session.clone(),
            access_token: token.access_token,
        });
        Ok(session)
    }
}

/// Diffs table snapshots on an interval and forwards row changes until the
/// subscription is cancelled or its receiver goes away.
async fn poll_changes(
    shared: Arc<RestShared>,
    table: String,
    filters: Vec<Filter>,
    interval: Duration,
    tx: Sender<ChangeEvent>,
    cancel: CancellationToken,
) {
    let query = Query {
        filters,
        order: None,
        limit: None,
    };
    let mut seen: HashMap<String, Row> = HashMap::new();
    let mut primed = false;

    'poll: loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        let rows = match shared.select_rows(&table, &query).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(table = %table, "change-feed poll failed: {err}");
                continue;
            }
        };

        let mut current: HashMap<String, Row> = HashMap::new();
        for row in rows {
            let Some(id) = row.get("id").map(Value::to_string) else {
                continue;
            };
            current.insert(id, row);
        }

        if primed {
            for (id, row) in &current {
                let op = match seen.get(id) {
                    None => ChangeOp::Insert,
                    Some(prev) if prev != row => ChangeOp::Update,
                    Some(_) => continue,
                };
                let event = ChangeEvent {
                    table: table.clone(),
                    op,
                    row: row.clone(),
                };
                if tx.send(event).await.is_err() {
                    break 'poll;
                }
            }
            for (id, row) in &seen {
                if !current.contains_key(id) {
                    let event = ChangeEvent {
                        table: table.clone(),
                        op: ChangeOp::Delete,
                        row: row.clone(),
                    };
                    if tx.send(event).await.is_err() {
                        break 'poll;
                    }
                }
            }
        }

        seen = current;
        primed = true;
    }
}

#[async_trait]
impl DataAccess for RestBackend {
    async fn get_session(&self) -> Result<Option<AuthSession>, BackendError> {
        Ok(self
            .shared
            .auth
            .read()
            .as_ref()
            .map(|state| state.session.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        self.exchange_token("password", json!({"email": email, "password": password}))
            .await
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        id_token: &str,
    ) -> Result<AuthSession, BackendError> {
        self.exchange_token("id_token", json!({"provider": provider, "id_token": id_token}))
            .await
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let res = self
            .shared
            .request(Method::POST, "/auth/v1/logout")
            .send()
            .await;

        *self.shared.auth.write() = None;
        RestShared::expect_success(res?).await?;
        Ok(())
    }

    async fn select(&self, table: &str, query: Query) -> Result<Vec<Row>, BackendError> {
        self.shared.select_rows(table, &query).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, BackendError> {
        let res = self
            .shared
            .request(Method::POST, &format!("/rest/v1/{table}"))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows = RestShared::expect_success(res)
            .await?
            .json::<Vec<Row>>()
            .await?;
        rows.drain(..)
            .next()
            .ok_or_else(|| BackendError::Request("empty insert response".to_string()))
    }

    async fn upsert(
        &self,
        table: &str,
        row: Row,
        conflict_columns: &[&str],
    ) -> Result<Row, BackendError> {
        let res = self
            .shared
            .request(Method::POST, &format!("/rest/v1/{table}"))
            .query(&[("on_conflict", conflict_columns.join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows = RestShared::expect_success(res)
            .await?
            .json::<Vec<Row>>()
            .await?;
        rows.drain(..)
            .next()
            .ok_or_else(|| BackendError::Request("empty upsert response".to_string()))
    }

    async fn subscribe(
        &self,
        table: &str,
        filters: Vec<Filter>,
    ) -> Result<Subscription, BackendError> {
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (tx, events) = async_channel::unbounded();
        let cancel = CancellationToken::new();

        tokio::spawn(poll_changes(
            self.shared.clone(),
            table.to_string(),
            filters,
            self.poll_interval,
            tx,
            cancel.clone(),
        ));

        self.subscriptions.insert(id, cancel);
        Ok(Subscription { id, events })
    }

    async fn unsubscribe(&self, subscription: SubscriptionId) -> Result<(), BackendError> {
        if let Some((_, cancel)) = self.subscriptions.remove(&subscription) {
            cancel.cancel();
        }
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let res = self
            .shared
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{key}"))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|err| BackendError::Storage(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(BackendError::Storage(format!("{status}: {body}")));
        }
        Ok(key.to_string())
    }

    fn get_public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.shared.base_url.trim_end_matches('/')
        )
    }
}
