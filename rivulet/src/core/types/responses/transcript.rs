use serde::Serialize;

use crate::core::entities::models::{Membership, Message, UserProfile};

/// A message enriched with its author. Authors without a profile row carry
/// the "Anonymous" placeholder.
#[derive(Debug, Serialize, Clone)]
pub struct TranscriptEntry {
    #[serde(flatten)]
    pub message: Message,
    pub author: UserProfile,
}

#[derive(Debug, Serialize, Clone)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub membership: Membership,
    pub profile: UserProfile,
}
