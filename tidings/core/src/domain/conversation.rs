// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Display name of the speaker
    pub user: String,

    pub text: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Read-only view over the message history
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Number of messages recorded in a room
    async fn count_messages(&self, room_id: RoomId) -> Result<usize, ConversationError>;

    /// Most recent messages of a room, oldest first, at most `limit`
    async fn recent_messages(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, ConversationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation store error: {0}")]
    Backend(String),
}

/// Render messages as `user: text` lines for prompt composition.
pub fn format_messages(messages: &[ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.user, m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_messages() {
        let messages = vec![
            ConversationMessage::new("alice", "We shipped the new release"),
            ConversationMessage::new("bob", "Congrats!"),
        ];

        assert_eq!(
            format_messages(&messages),
            "alice: We shipped the new release\nbob: Congrats!"
        );
    }

    #[test]
    fn test_room_id_roundtrip() {
        let id = RoomId::new();
        let parsed = RoomId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
