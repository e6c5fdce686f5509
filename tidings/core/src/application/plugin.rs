// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Host-facing façade pairing the extractor with the gate.
//!
//! Failures stop here: a failed extraction is logged and dropped, and a
//! failed gate yields an empty string so the post goes out without context.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::application::reflection_extractor::{ExtractionOutcome, ReflectionExtractor};
use crate::application::reflection_gate::ReflectionGate;
use crate::domain::action::PendingAction;
use crate::domain::conversation::RoomId;

pub struct ReflectionsPlugin {
    extractor: Arc<ReflectionExtractor>,
    gate: Arc<ReflectionGate>,
}

impl ReflectionsPlugin {
    pub fn new(extractor: Arc<ReflectionExtractor>, gate: Arc<ReflectionGate>) -> Self {
        Self { extractor, gate }
    }

    pub fn name(&self) -> &'static str {
        "reflections"
    }

    pub fn description(&self) -> &'static str {
        "Extracts post-worthy facts from conversations and surfaces them when composing posts"
    }

    pub fn extractor(&self) -> &Arc<ReflectionExtractor> {
        &self.extractor
    }

    pub fn gate(&self) -> &Arc<ReflectionGate> {
        &self.gate
    }

    /// Incoming-turn hook
    pub async fn on_turn(&self, room_id: RoomId) -> Option<ExtractionOutcome> {
        Self::turn(&self.extractor, room_id).await
    }

    /// Run the turn hook on a background task
    pub fn spawn_on_turn(&self, room_id: RoomId) -> JoinHandle<Option<ExtractionOutcome>> {
        let extractor = Arc::clone(&self.extractor);
        tokio::spawn(async move { Self::turn(&extractor, room_id).await })
    }

    /// Post-composition hook. Returns the text to merge into the post.
    pub async fn provide_post_context(&self, action: &PendingAction) -> String {
        match self.gate.surface(action).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to surface reflections, posting without them");
                String::new()
            }
        }
    }

    async fn turn(extractor: &ReflectionExtractor, room_id: RoomId) -> Option<ExtractionOutcome> {
        match extractor.on_turn(room_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(room_id = %room_id, error = %e, "Reflection extraction failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent_config::ReflectionsConfig;
    use crate::domain::cache::{CacheError, CacheStore};
    use crate::domain::conversation::ConversationMessage;
    use crate::domain::extraction::{ExtractionError, ExtractionModel};
    use crate::infrastructure::cache::InMemoryCacheStore;
    use crate::infrastructure::conversation::InMemoryConversationStore;
    use crate::infrastructure::repositories::CacheReflectionStore;
    use crate::infrastructure::settings::ConfigSettings;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    struct FixedModel(Value);

    #[async_trait]
    impl ExtractionModel for FixedModel {
        async fn extract(&self, _prompt: &str) -> Result<Value, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Backend("cache offline".to_string()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), CacheError> {
            Err(CacheError::Backend("cache offline".to_string()))
        }
    }

    fn plugin(cache: Arc<dyn CacheStore>, answer: Value) -> (ReflectionsPlugin, Arc<InMemoryConversationStore>) {
        let store = Arc::new(CacheReflectionStore::new(cache, "Herald/reflections"));
        let conversations = Arc::new(InMemoryConversationStore::new());
        let config = ReflectionsConfig::default();
        let settings = Arc::new(ConfigSettings::isolated(HashMap::from([(
            config.feature_flag.clone(),
            "true".to_string(),
        )])));

        let extractor = ReflectionExtractor::new(
            store.clone(),
            conversations.clone(),
            Arc::new(FixedModel(answer)),
            settings.clone(),
            "Herald",
            config.clone(),
        );
        let gate = ReflectionGate::new(store, settings, config.feature_flag);
        (
            ReflectionsPlugin::new(Arc::new(extractor), Arc::new(gate)),
            conversations,
        )
    }

    #[tokio::test]
    async fn test_turn_then_post() {
        let (plugin, _) = plugin(
            Arc::new(InMemoryCacheStore::new()),
            json!([{ "text": "Library opens on Sundays", "used": false }]),
        );
        let room = RoomId::new();

        let outcome = plugin.on_turn(room).await;
        assert_eq!(outcome.map(|o| o.appended), Some(1));

        let text = plugin.provide_post_context(&PendingAction::post()).await;
        assert_eq!(text, "Library opens on Sundays");
        assert_eq!(plugin.provide_post_context(&PendingAction::post()).await, "");
    }

    #[tokio::test]
    async fn test_spawn_on_turn_respects_trigger() {
        let (plugin, conversations) = plugin(Arc::new(InMemoryCacheStore::new()), json!([]));
        let room = RoomId::new();
        conversations
            .record(room, ConversationMessage::new("alice", "hello"))
            .await;

        let outcome = plugin.spawn_on_turn(room).await.unwrap();
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let (plugin, _) = plugin(Arc::new(BrokenCache), json!([]));

        assert_eq!(plugin.on_turn(RoomId::new()).await, None);
        assert_eq!(plugin.provide_post_context(&PendingAction::post()).await, "");
    }

    #[test]
    fn test_metadata() {
        let (plugin, _) = plugin(Arc::new(InMemoryCacheStore::new()), json!([]));
        assert_eq!(plugin.name(), "reflections");
        assert!(!plugin.description().is_empty());
    }
}
