// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory conversation store and transcript loading
//!
//! Hosts that own a real message database implement `ConversationStore`
//! themselves. This store backs the CLI and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::{ConversationError, ConversationMessage, ConversationStore, RoomId};

#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    rooms: Arc<RwLock<HashMap<RoomId, Vec<ConversationMessage>>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a room, creating the room on first use
    pub async fn record(&self, room_id: RoomId, message: ConversationMessage) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id).or_default().push(message);
    }

    /// Load every message of a transcript into its room
    pub async fn load_transcript(&self, transcript: Transcript) -> RoomId {
        let room_id = transcript.room_id.unwrap_or_default();
        let mut rooms = self.rooms.write().await;
        rooms.entry(room_id).or_default().extend(transcript.messages);
        room_id
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn count_messages(&self, room_id: RoomId) -> Result<usize, ConversationError> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&room_id).map(Vec::len).unwrap_or(0))
    }

    async fn recent_messages(
        &self,
        room_id: RoomId,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, ConversationError> {
        let rooms = self.rooms.read().await;
        let Some(messages) = rooms.get(&room_id) else {
            return Ok(Vec::new());
        };
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}

/// Conversation file accepted by the CLI (JSON or YAML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,

    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}

impl Transcript {
    /// Parse by extension: `.yaml`/`.yml` as YAML, everything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let transcript = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(transcript)
    }
}
