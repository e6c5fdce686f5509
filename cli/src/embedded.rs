// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-process wiring of the reflection services
//!
//! Builds the store, settings, conversation store and model adapters from the
//! agent manifest. Every CLI invocation gets a fresh runtime; with the file
//! cache backend the queue survives between invocations.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use tidings_core::{
    application::{ReflectionExtractor, ReflectionGate},
    domain::{
        agent_config::{AgentConfigManifest, AgentConfigSpec},
        events::ReflectionEvent,
        extraction::ExtractionModel,
        llm::GenerationOptions,
        repository::ReflectionStore,
        settings::SettingsProvider,
    },
    infrastructure::{
        cache::cache_from_config,
        conversation::InMemoryConversationStore,
        event_bus::{EventBus, EventBusError, EventReceiver},
        llm::ProviderRegistry,
        llm_extraction::LlmExtractionModel,
        prompt_template_engine::PromptTemplateEngine,
        repositories::CacheReflectionStore,
        settings::ConfigSettings,
    },
};

pub struct EmbeddedRuntime {
    spec: AgentConfigSpec,
    store: Arc<CacheReflectionStore>,
    settings: Arc<ConfigSettings>,
    conversations: Arc<InMemoryConversationStore>,
    event_bus: Arc<EventBus>,
}

impl EmbeddedRuntime {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let manifest = AgentConfigManifest::load_or_default(config_path)
            .context("Failed to load configuration")?;
        manifest
            .validate()
            .context("Configuration validation failed")?;
        Self::from_spec(manifest.spec)
    }

    pub fn from_spec(spec: AgentConfigSpec) -> Result<Self> {
        if let Some(template) = &spec.reflections.prompt_template {
            PromptTemplateEngine::new()
                .validate_template(template)
                .context("Invalid spec.reflections.prompt_template")?;
        }

        let cache = cache_from_config(&spec).context("Failed to initialize cache backend")?;
        let store = Arc::new(
            CacheReflectionStore::new(cache, spec.reflections_cache_key())
                .with_retention(spec.reflections.retention.clone()),
        );
        let settings = Arc::new(ConfigSettings::new(spec.settings.clone()));

        Ok(Self {
            spec,
            store,
            settings,
            conversations: Arc::new(InMemoryConversationStore::new()),
            event_bus: Arc::new(EventBus::with_default_capacity()),
        })
    }

    pub fn spec(&self) -> &AgentConfigSpec {
        &self.spec
    }

    pub fn store(&self) -> Arc<dyn ReflectionStore> {
        self.store.clone()
    }

    pub fn conversations(&self) -> &Arc<InMemoryConversationStore> {
        &self.conversations
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn reflections_enabled(&self) -> bool {
        self.settings.is_enabled(&self.spec.reflections.feature_flag)
    }

    /// Extraction model bound to the configured alias
    pub fn extraction_model(&self) -> Result<Arc<dyn ExtractionModel>> {
        let registry = Arc::new(
            ProviderRegistry::from_config(&self.spec)
                .context("Failed to initialize LLM providers")?,
        );
        let bound = registry
            .bind(self.spec.reflections.model_alias.as_str())
            .context("No LLM provider serves the reflection model alias")?;
        Ok(Arc::new(
            LlmExtractionModel::new(Arc::new(bound)).with_options(GenerationOptions::default()),
        ))
    }

    pub fn extractor(&self, model: Arc<dyn ExtractionModel>) -> ReflectionExtractor {
        ReflectionExtractor::new(
            self.store.clone(),
            self.conversations.clone(),
            model,
            self.settings.clone(),
            self.spec.agent.name.clone(),
            self.spec.reflections.clone(),
        )
        .with_event_bus(self.event_bus.clone())
    }

    pub fn gate(&self) -> ReflectionGate {
        ReflectionGate::new(
            self.store.clone(),
            self.settings.clone(),
            self.spec.reflections.feature_flag.clone(),
        )
        .with_event_bus(self.event_bus.clone())
    }
}

/// Log every event buffered on `receiver` and return how many were seen
pub fn log_events(receiver: &mut EventReceiver) -> usize {
    let mut seen = 0;
    loop {
        match receiver.try_recv() {
            Ok(event) => {
                seen += 1;
                match event {
                    ReflectionEvent::ReflectionsExtracted {
                        room_id,
                        appended,
                        queue_len,
                        extracted_at,
                    } => info!(
                        room_id = %room_id,
                        appended,
                        queue_len,
                        at = %extracted_at,
                        "Event: reflections extracted"
                    ),
                    ReflectionEvent::ExtractionFailed {
                        room_id,
                        reason,
                        failed_at,
                    } => warn!(
                        room_id = %room_id,
                        reason = %reason,
                        at = %failed_at,
                        "Event: extraction failed"
                    ),
                    ReflectionEvent::ReflectionsSurfaced { count, surfaced_at } => {
                        info!(count, at = %surfaced_at, "Event: reflections surfaced")
                    }
                }
            }
            Err(EventBusError::Lagged(_)) => continue,
            Err(EventBusError::Empty) | Err(EventBusError::Closed) => return seen,
        }
    }
}
