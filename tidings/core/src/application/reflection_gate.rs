// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reflection Gate
//!
//! Consumer side of the reflection lifecycle. When a post is being composed,
//! it hands over every reflection not surfaced yet and marks the whole queue
//! used, so each fact reaches at most one post.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::error::ReflectionError;
use crate::domain::action::PendingAction;
use crate::domain::events::ReflectionEvent;
use crate::domain::reflection::Reflection;
use crate::domain::repository::ReflectionStore;
use crate::domain::settings::SettingsProvider;
use crate::infrastructure::event_bus::EventBus;

pub struct ReflectionGate {
    store: Arc<dyn ReflectionStore>,
    settings: Arc<dyn SettingsProvider>,
    feature_flag: String,
    event_bus: Option<Arc<EventBus>>,
}

impl ReflectionGate {
    pub fn new(
        store: Arc<dyn ReflectionStore>,
        settings: Arc<dyn SettingsProvider>,
        feature_flag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            settings,
            feature_flag: feature_flag.into(),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Newline-joined text of the unused reflections, or `""`.
    ///
    /// The store is not touched unless `action` is a post and the feature
    /// flag is enabled.
    pub async fn surface(&self, action: &PendingAction) -> Result<String, ReflectionError> {
        if !action.kind.is_post() {
            return Ok(String::new());
        }
        if !self.settings.is_enabled(&self.feature_flag) {
            debug!("Reflections disabled, nothing surfaced");
            return Ok(String::new());
        }

        let surfaced = self.store.take_unused().await?;
        if surfaced.is_empty() {
            return Ok(String::new());
        }

        let count = surfaced.len();
        metrics::counter!("tidings_reflections_surfaced_total").increment(count as u64);
        info!(count, "Reflections surfaced into post");
        if let Some(bus) = &self.event_bus {
            bus.publish(ReflectionEvent::ReflectionsSurfaced {
                count,
                surfaced_at: Utc::now(),
            });
        }

        Ok(surfaced
            .iter()
            .map(Reflection::text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
