use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::client::{DataAccess, from_row, from_rows, to_row};
use crate::backend::query::Query;
use crate::core::entities::models::{Message, NewMessage};
use crate::core::types::errors::backend_error::BackendError;

pub const MESSAGES_TABLE: &str = "messages";

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// The `limit` most recent messages of a room, returned ascending by
    /// creation time.
    async fn recent_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, BackendError>;

    async fn create_message(&self, message: NewMessage) -> Result<Message, BackendError>;
}

#[derive(Clone)]
pub struct ChatRepositoryImpl {
    backend: Arc<dyn DataAccess>,
}

impl ChatRepositoryImpl {
    pub fn new(backend: Arc<dyn DataAccess>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ChatRepository for ChatRepositoryImpl {
    async fn recent_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, BackendError> {
        let rows = self
            .backend
            .select(
                MESSAGES_TABLE,
                Query::new()
                    .eq("room_id", room_id)
                    .order_desc("created_at")
                    .limit(limit),
            )
            .await?;

        let mut messages: Vec<Message> = from_rows(rows)?;
        messages.reverse();
        Ok(messages)
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, BackendError> {
        let row = self
            .backend
            .insert(MESSAGES_TABLE, to_row(&message)?)
            .await?;

        from_row(row)
    }
}
