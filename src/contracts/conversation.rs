//! ConversationTurn / ConversationState contracts (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// An immutable snapshot of a session's turns, as handed out by
/// [`crate::conversation_store::ConversationStore`]. Never a mutable
/// reference into the store's internal state (§3 Ownership, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
}
