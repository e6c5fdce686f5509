// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reflection Extractor
//!
//! Producer side of the reflection lifecycle. Every few turns it asks the
//! extraction model for post-worthy facts in the recent conversation and
//! appends them to the reflection queue.
//!
//! The queue snapshot read for the prompt is never written back. New
//! candidates go through [`ReflectionStore::append`], which re-reads the
//! canonical queue under the store's lock, so a gate call that lands while
//! the model is thinking is never reverted.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::application::error::ReflectionError;
use crate::domain::agent_config::ReflectionsConfig;
use crate::domain::conversation::{format_messages, ConversationStore, RoomId};
use crate::domain::events::ReflectionEvent;
use crate::domain::extraction::{parse_candidates, ExtractionModel};
use crate::domain::repository::ReflectionStore;
use crate::domain::settings::SettingsProvider;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::prompt_template_engine::{
    default_examples, PromptTemplateEngine, ReflectionExample, ReflectionPromptContext,
};

/// Result of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Candidates appended by this run
    pub appended: usize,
    /// Queue length after the append
    pub queue_len: usize,
}

pub struct ReflectionExtractor {
    store: Arc<dyn ReflectionStore>,
    conversations: Arc<dyn ConversationStore>,
    model: Arc<dyn ExtractionModel>,
    settings: Arc<dyn SettingsProvider>,
    engine: PromptTemplateEngine,
    agent_name: String,
    config: ReflectionsConfig,
    examples: Vec<ReflectionExample>,
    event_bus: Option<Arc<EventBus>>,
}

impl ReflectionExtractor {
    pub fn new(
        store: Arc<dyn ReflectionStore>,
        conversations: Arc<dyn ConversationStore>,
        model: Arc<dyn ExtractionModel>,
        settings: Arc<dyn SettingsProvider>,
        agent_name: impl Into<String>,
        config: ReflectionsConfig,
    ) -> Self {
        Self {
            store,
            conversations,
            model,
            settings,
            engine: PromptTemplateEngine::new(),
            agent_name: agent_name.into(),
            config,
            examples: default_examples(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_examples(mut self, examples: Vec<ReflectionExample>) -> Self {
        self.examples = examples;
        self
    }

    /// Whether a turn in `room_id` should trigger extraction.
    ///
    /// The feature flag is checked first. When it is off, the conversation
    /// store is not consulted.
    pub async fn should_fire(&self, room_id: RoomId) -> Result<bool, ReflectionError> {
        if !self.settings.is_enabled(&self.config.feature_flag) {
            return Ok(false);
        }

        let count = self.conversations.count_messages(room_id).await? as u64;
        Ok(count
            .checked_rem(self.config.turn_interval)
            .is_some_and(|rem| rem == 0))
    }

    /// Extract reflections from the recent conversation and append them,
    /// skipping the turn cadence.
    ///
    /// Returns `None` without touching any store when the feature flag is off.
    pub async fn run(&self, room_id: RoomId) -> Result<Option<ExtractionOutcome>, ReflectionError> {
        if !self.settings.is_enabled(&self.config.feature_flag) {
            debug!(room_id = %room_id, "Reflections disabled, extraction skipped");
            return Ok(None);
        }

        let started = Instant::now();
        let result = self.extract_and_append(room_id).await;
        metrics::histogram!("tidings_extraction_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                metrics::counter!("tidings_reflections_extracted_total")
                    .increment(outcome.appended as u64);
                info!(
                    room_id = %room_id,
                    appended = outcome.appended,
                    queue_len = outcome.queue_len,
                    "Reflections extracted"
                );
                self.publish(ReflectionEvent::ReflectionsExtracted {
                    room_id,
                    appended: outcome.appended,
                    queue_len: outcome.queue_len,
                    extracted_at: Utc::now(),
                });
            }
            Err(e) => {
                metrics::counter!("tidings_extraction_failures_total").increment(1);
                self.publish(ReflectionEvent::ExtractionFailed {
                    room_id,
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }

        result.map(Some)
    }

    /// Turn hook: evaluate the trigger and run when it fires
    pub async fn on_turn(
        &self,
        room_id: RoomId,
    ) -> Result<Option<ExtractionOutcome>, ReflectionError> {
        if !self.should_fire(room_id).await? {
            debug!(room_id = %room_id, "Reflection trigger did not fire");
            return Ok(None);
        }
        self.run(room_id).await
    }

    async fn extract_and_append(&self, room_id: RoomId) -> Result<ExtractionOutcome, ReflectionError> {
        let snapshot = self.store.get().await?.unwrap_or_default();
        let messages = self
            .conversations
            .recent_messages(room_id, self.config.recent_message_count)
            .await?;

        let context = ReflectionPromptContext::new(self.agent_name.as_str())
            .recent_messages(format_messages(&messages))
            .reflections(snapshot.texts())
            .examples(&self.examples);
        let prompt = self
            .engine
            .render_with_fallback(self.config.prompt_template.as_deref(), &context)
            .map_err(|e| ReflectionError::Prompt(format!("{:#}", e)))?;

        debug!(room_id = %room_id, prompt = %prompt, "Invoking extraction model");
        let answer = self.model.extract(&prompt).await?;
        debug!(room_id = %room_id, answer = %answer, "Extraction model answered");

        let candidates = self.config.used_flag_policy.apply(parse_candidates(answer)?);
        let appended = candidates.len();
        let queue = self.store.append(candidates).await?;

        Ok(ExtractionOutcome {
            appended,
            queue_len: queue.len(),
        })
    }

    fn publish(&self, event: ReflectionEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationMessage;
    use crate::domain::extraction::{ExtractionError, UsedFlagPolicy};
    use crate::domain::reflection::{Reflection, ReflectionQueue};
    use crate::infrastructure::cache::InMemoryCacheStore;
    use crate::infrastructure::conversation::InMemoryConversationStore;
    use crate::infrastructure::repositories::CacheReflectionStore;
    use crate::infrastructure::settings::ConfigSettings;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Returns a fixed answer and remembers the prompts it saw
    struct ScriptedModel {
        answer: serde_json::Value,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(answer: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                answer,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ExtractionModel for ScriptedModel {
        async fn extract(&self, prompt: &str) -> Result<serde_json::Value, ExtractionError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    struct Fixture {
        store: Arc<CacheReflectionStore>,
        conversations: Arc<InMemoryConversationStore>,
        room: RoomId,
    }

    async fn fixture(message_count: usize) -> Fixture {
        let conversations = Arc::new(InMemoryConversationStore::new());
        let room = RoomId::new();
        for i in 0..message_count {
            conversations
                .record(room, ConversationMessage::new("alice", format!("message {}", i)))
                .await;
        }
        Fixture {
            store: Arc::new(CacheReflectionStore::new(
                Arc::new(InMemoryCacheStore::new()),
                "Herald/reflections",
            )),
            conversations,
            room,
        }
    }

    fn settings(enabled: bool) -> Arc<ConfigSettings> {
        Arc::new(ConfigSettings::isolated(HashMap::from([(
            "TWITTER_USE_DEFAULT_REFLECTIONS".to_string(),
            enabled.to_string(),
        )])))
    }

    fn extractor(
        fixture: &Fixture,
        model: Arc<dyn ExtractionModel>,
        enabled: bool,
        config: ReflectionsConfig,
    ) -> ReflectionExtractor {
        ReflectionExtractor::new(
            fixture.store.clone(),
            fixture.conversations.clone(),
            model,
            settings(enabled),
            "Herald",
            config,
        )
    }

    #[tokio::test]
    async fn test_trigger_cadence() {
        for count in 0..=9 {
            let fixture = fixture(count).await;
            let extractor = extractor(
                &fixture,
                ScriptedModel::new(json!([])),
                true,
                ReflectionsConfig::default(),
            );
            assert_eq!(
                extractor.should_fire(fixture.room).await.unwrap(),
                count % 4 == 0,
                "count {}",
                count
            );
        }
    }

    #[tokio::test]
    async fn test_trigger_custom_interval() {
        let fixture = fixture(6).await;
        let config = ReflectionsConfig {
            turn_interval: 3,
            ..ReflectionsConfig::default()
        };
        let extractor = extractor(&fixture, ScriptedModel::new(json!([])), true, config);
        assert!(extractor.should_fire(fixture.room).await.unwrap());
    }

    #[tokio::test]
    async fn test_disabled_flag_never_fires() {
        let fixture = fixture(8).await;
        let extractor = extractor(
            &fixture,
            ScriptedModel::new(json!([])),
            false,
            ReflectionsConfig::default(),
        );
        assert!(!extractor.should_fire(fixture.room).await.unwrap());
        assert_eq!(extractor.on_turn(fixture.room).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_run_respects_disabled_flag() {
        let fixture = fixture(8).await;
        let model = ScriptedModel::new(json!([{ "text": "leaked", "used": false }]));
        let extractor = extractor(&fixture, model.clone(), false, ReflectionsConfig::default());

        assert_eq!(extractor.run(fixture.room).await.unwrap(), None);
        assert!(fixture.store.get().await.unwrap().is_none());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_appends_candidates_and_prompts_with_history() {
        let fixture = fixture(4).await;
        fixture
            .store
            .set(&ReflectionQueue::from(vec![Reflection::from_parts("Old news", true)]))
            .await
            .unwrap();
        let model = ScriptedModel::new(json!([{ "text": "Fresh fact", "used": false }]));
        let extractor = extractor(&fixture, model.clone(), true, ReflectionsConfig::default());

        let outcome = extractor.on_turn(fixture.room).await.unwrap();

        assert_eq!(
            outcome,
            Some(ExtractionOutcome {
                appended: 1,
                queue_len: 2
            })
        );
        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("alice: message 3"));
        assert!(prompt.contains("Old news"));
        assert!(prompt.contains("Ignore everything said by Herald."));
    }

    #[tokio::test]
    async fn test_used_flag_policy() {
        let answer = json!([{ "text": "Covered already", "used": true }]);

        let verbatim = fixture(0).await;
        extractor(&verbatim, ScriptedModel::new(answer.clone()), true, ReflectionsConfig::default())
            .run(verbatim.room)
            .await
            .unwrap();
        let queue = verbatim.store.get().await.unwrap().unwrap();
        assert!(queue.iter().all(Reflection::is_used));

        let forced = fixture(0).await;
        let config = ReflectionsConfig {
            used_flag_policy: UsedFlagPolicy::ForceUnused,
            ..ReflectionsConfig::default()
        };
        extractor(&forced, ScriptedModel::new(answer), true, config)
            .run(forced.room)
            .await
            .unwrap();
        let queue = forced.store.get().await.unwrap().unwrap();
        assert_eq!(queue.unused_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_answer_writes_nothing() {
        let fixture = fixture(0).await;
        let bus = Arc::new(EventBus::new(8));
        let mut events = bus.subscribe();
        let extractor = extractor(
            &fixture,
            ScriptedModel::new(json!({ "text": "not an array" })),
            true,
            ReflectionsConfig::default(),
        )
        .with_event_bus(bus);

        let err = extractor.run(fixture.room).await.unwrap_err();

        assert!(matches!(
            err,
            ReflectionError::Extraction(ExtractionError::Malformed(_))
        ));
        assert!(fixture.store.get().await.unwrap().is_none());
        assert!(matches!(
            events.try_recv().unwrap(),
            ReflectionEvent::ExtractionFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_answer_still_writes() {
        let fixture = fixture(0).await;
        let outcome = extractor(
            &fixture,
            ScriptedModel::new(json!([])),
            true,
            ReflectionsConfig::default(),
        )
        .run(fixture.room)
        .await
        .unwrap()
        .expect("flag enabled");

        assert_eq!(outcome.appended, 0);
        assert_eq!(fixture.store.get().await.unwrap(), Some(ReflectionQueue::new()));
    }

    #[tokio::test]
    async fn test_bad_template_is_prompt_error() {
        let fixture = fixture(0).await;
        let config = ReflectionsConfig {
            prompt_template: Some("{{#if}}".to_string()),
            ..ReflectionsConfig::default()
        };
        let err = extractor(&fixture, ScriptedModel::new(json!([])), true, config)
            .run(fixture.room)
            .await
            .unwrap_err();
        assert!(matches!(err, ReflectionError::Prompt(_)));
    }
}
