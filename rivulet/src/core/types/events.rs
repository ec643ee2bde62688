use async_channel::{Receiver, Sender};

use super::responses::transcript::{RosterEntry, TranscriptEntry};

/// Paired channel ends for one session's UI event stream.
#[derive(Debug, Clone)]
pub struct SessionChannel {
    pub tx: Sender<SessionEvent>,
    pub rx: Receiver<SessionEvent>,
}

impl SessionChannel {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }
}

impl Default for SessionChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageReceived(TranscriptEntry),
    RosterChanged(Vec<RosterEntry>),
    Closed,
}
