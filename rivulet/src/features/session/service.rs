use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{Receiver, Sender};
use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::client::{ChangeEvent, ChangeOp, DataAccess, SubscriptionId, from_row};
use crate::backend::query::Filter;
use crate::core::entities::models::{
    Message, MessageKind, NewMembership, NewMessage, Room, UserProfile,
};
use crate::core::types::errors::auth_error::AuthError;
use crate::core::types::errors::backend_error::BackendError;
use crate::core::types::errors::session_error::SessionError;
use crate::core::types::events::{SessionChannel, SessionEvent};
use crate::core::types::responses::transcript::{RosterEntry, TranscriptEntry};
use crate::core::utils::id_utils::canonical_join_code;
use crate::features::auth::service::AuthService;
use crate::features::directory::repository::{MEMBERSHIPS_TABLE, RoomRepository};
use crate::features::user::repository::UserRepository;

use super::repository::{ChatRepository, MESSAGES_TABLE};

pub const TRANSCRIPT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Active,
    Closed,
}

/// Opens [`RoomSession`]s. Construction takes every collaborator
/// explicitly; there is no ambient session state shared across screens.
pub struct RoomSessionManager<C, R, U, A>
where
    C: ChatRepository + Clone + Send + Sync + 'static,
    R: RoomRepository + Clone + Send + Sync + 'static,
    U: UserRepository + Clone + Send + Sync + 'static,
    A: AuthService,
{
    backend: Arc<dyn DataAccess>,
    chat_repository: C,
    room_repository: R,
    user_repository: U,
    auth_service: A,
}

impl<C, R, U, A> RoomSessionManager<C, R, U, A>
where
    C: ChatRepository + Clone + Send + Sync + 'static,
    R: RoomRepository + Clone + Send + Sync + 'static,
    U: UserRepository + Clone + Send + Sync + 'static,
    A: AuthService,
{
    pub fn new(
        backend: Arc<dyn DataAccess>,
        chat_repository: C,
        room_repository: R,
        user_repository: U,
        auth_service: A,
    ) -> Self {
        Self {
            backend,
            chat_repository,
            room_repository,
            user_repository,
            auth_service,
        }
    }

    /// Runs the whole entry sequence: resolve the user, find the room, join
    /// as participant, load history and roster, subscribe, start the event
    /// loop. Any failure leaves no live subscription behind.
    pub async fn open(&self, join_code: &str) -> Result<RoomSession, SessionError> {
        let user = self.auth_service.current_user().await.map_err(|err| match err {
            AuthError::Unauthenticated => SessionError::Unauthenticated,
            AuthError::Backend(err) => SessionError::Backend(err),
        })?;

        let code = canonical_join_code(join_code);
        let room = self
            .room_repository
            .get_active_room_by_code(&code)
            .await?
            .ok_or_else(|| SessionError::RoomCodeNotFound(code.clone()))?;

        let state = Arc::new(RwLock::new(SessionState::Initializing));

        self.room_repository
            .upsert_membership(NewMembership {
                room_id: room.id.clone(),
                user_id: user.user_id.clone(),
                active: true,
                joined_at: Utc::now(),
            })
            .await?;

        let transcript = self.load_transcript(&room.id).await?;
        let roster =
            load_roster(&self.room_repository, &self.user_repository, &room.id).await?;

        let message_sub = self
            .backend
            .subscribe(MESSAGES_TABLE, vec![Filter::eq("room_id", room.id.clone())])
            .await?;
        let participant_sub = match self
            .backend
            .subscribe(
                MEMBERSHIPS_TABLE,
                vec![Filter::eq("room_id", room.id.clone())],
            )
            .await
        {
            Ok(sub) => sub,
            Err(err) => {
                // The first subscription must not leak past this failure.
                let _ = self.backend.unsubscribe(message_sub.id).await;
                return Err(err.into());
            }
        };

        let channel = SessionChannel::new();
        let transcript = Arc::new(RwLock::new(transcript));
        let roster = Arc::new(RwLock::new(roster));
        let cancel = CancellationToken::new();

        let worker = SessionWorker {
            backend: self.backend.clone(),
            room_repository: self.room_repository.clone(),
            user_repository: self.user_repository.clone(),
            room_id: room.id.clone(),
            message_events: message_sub.events,
            message_sub: message_sub.id,
            participant_events: participant_sub.events,
            participant_sub: participant_sub.id,
            tx: channel.tx,
            state: state.clone(),
            transcript: transcript.clone(),
            roster: roster.clone(),
            cancel: cancel.clone(),
        };
        *state.write() = SessionState::Active;
        let loop_handle = tokio::spawn(worker.run());

        info!(room_id = %room.id, user_id = %user.user_id, "room session opened");

        Ok(RoomSession {
            room,
            user,
            chat_repository: Arc::new(self.chat_repository.clone()),
            state,
            transcript,
            roster,
            events: channel.rx,
            cancel,
            loop_handle: Mutex::new(Some(loop_handle)),
        })
    }

    async fn load_transcript(&self, room_id: &str) -> Result<Vec<TranscriptEntry>, SessionError> {
        let messages = self
            .chat_repository
            .recent_messages(room_id, TRANSCRIPT_HISTORY_LIMIT)
            .await?;

        let mut authors: Vec<String> = messages
            .iter()
            .map(|message| message.author_id.clone())
            .collect();
        authors.sort();
        authors.dedup();

        let profiles = join_all(
            authors
                .iter()
                .map(|author_id| self.user_repository.get_profile_or_anonymous(author_id)),
        )
        .await;
        let profiles: HashMap<String, UserProfile> =
            authors.into_iter().zip(profiles).collect();

        let transcript = messages
            .into_iter()
            .map(|message| {
                let author = profiles
                    .get(&message.author_id)
                    .cloned()
                    .unwrap_or_else(|| UserProfile::anonymous(&message.author_id));
                TranscriptEntry { message, author }
            })
            .collect();

        Ok(transcript)
    }
}

async fn load_roster<R, U>(
    room_repository: &R,
    user_repository: &U,
    room_id: &str,
) -> Result<Vec<RosterEntry>, BackendError>
where
    R: RoomRepository,
    U: UserRepository,
{
    let memberships = room_repository.active_memberships(room_id).await?;

    let entries = join_all(memberships.into_iter().map(|membership| async move {
        let profile = user_repository
            .get_profile_or_anonymous(&membership.user_id)
            .await;
        RosterEntry {
            membership,
            profile,
        }
    }))
    .await;

    Ok(entries)
}

/// One open room: the transcript and roster caches it owns, the live event
/// stream, and the send path. `Initializing → Active → Closed`.
pub struct RoomSession {
    room: Room,
    user: UserProfile,
    chat_repository: Arc<dyn ChatRepository>,
    state: Arc<RwLock<SessionState>>,
    transcript: Arc<RwLock<Vec<TranscriptEntry>>>,
    roster: Arc<RwLock<Vec<RosterEntry>>>,
    events: Receiver<SessionEvent>,
    cancel: CancellationToken,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("room", &self.room)
            .field("user", &self.user)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

impl RoomSession {
    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Snapshot of the transcript in creation-time order (live appends in
    /// delivery order).
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.read().clone()
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.roster.read().clone()
    }

    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    /// Persists a text message. Blank input is a no-op; the stored message
    /// reaches the transcript only through the subscription round-trip,
    /// never by local insertion.
    pub async fn send_message(&self, text: &str) -> Result<(), SessionError> {
        if self.state() == SessionState::Closed {
            return Err(SessionError::Closed);
        }

        let body = text.trim();
        if body.is_empty() {
            debug!(room_id = %self.room.id, "ignoring blank message");
            return Ok(());
        }

        self.chat_repository
            .create_message(NewMessage {
                room_id: self.room.id.clone(),
                author_id: self.user.user_id.clone(),
                body: body.to_string(),
                kind: MessageKind::Text,
                created_at: Utc::now(),
            })
            .await?;

        Ok(())
    }

    /// Stops the event loop and releases both subscriptions. Idempotent.
    pub async fn close(&self) {
        self.cancel.cancel();

        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        // The worker releases the subscriptions on its way out.
        self.cancel.cancel();
    }
}

struct SessionWorker<R, U>
where
    R: RoomRepository,
    U: UserRepository,
{
    backend: Arc<dyn DataAccess>,
    room_repository: R,
    user_repository: U,
    room_id: String,
    message_events: Receiver<ChangeEvent>,
    message_sub: SubscriptionId,
    participant_events: Receiver<ChangeEvent>,
    participant_sub: SubscriptionId,
    tx: Sender<SessionEvent>,
    state: Arc<RwLock<SessionState>>,
    transcript: Arc<RwLock<Vec<TranscriptEntry>>>,
    roster: Arc<RwLock<Vec<RosterEntry>>>,
    cancel: CancellationToken,
}

impl<R, U> SessionWorker<R, U>
where
    R: RoomRepository,
    U: UserRepository,
{
    async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.message_events.recv() => match event {
                    Ok(event) => self.handle_message_event(event).await,
                    Err(_) => break,
                },
                event = self.participant_events.recv() => match event {
                    Ok(_) => self.reload_roster().await,
                    Err(_) => break,
                },
            }
        }

        let _ = self.backend.unsubscribe(self.message_sub).await;
        let _ = self.backend.unsubscribe(self.participant_sub).await;
        *self.state.write() = SessionState::Closed;
        let _ = self.tx.send(SessionEvent::Closed).await;
        debug!(room_id = %self.room_id, "room session closed");
    }

    /// Appends in delivery order; the author profile is re-fetched per
    /// event. Messages are immutable, so only inserts matter.
    async fn handle_message_event(&self, event: ChangeEvent) {
        if event.op != ChangeOp::Insert {
            return;
        }

        let message: Message = match from_row(event.row) {
            Ok(message) => message,
            Err(err) => {
                warn!(room_id = %self.room_id, "undecodable message event: {err}");
                return;
            }
        };

        let author = self
            .user_repository
            .get_profile_or_anonymous(&message.author_id)
            .await;
        let entry = TranscriptEntry { message, author };

        self.transcript.write().push(entry.clone());
        let _ = self.tx.send(SessionEvent::MessageReceived(entry)).await;
    }

    /// Any participant change reloads the full roster. A failed reload is
    /// logged once and dropped, not retried.
    async fn reload_roster(&self) {
        match load_roster(&self.room_repository, &self.user_repository, &self.room_id).await {
            Ok(roster) => {
                *self.roster.write() = roster.clone();
                let _ = self.tx.send(SessionEvent::RosterChanged(roster)).await;
            }
            Err(err) => {
                warn!(room_id = %self.room_id, "roster reload failed: {err}");
            }
        }
    }
}
