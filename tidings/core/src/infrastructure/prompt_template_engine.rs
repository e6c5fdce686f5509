// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Prompt Template Engine
//!
//! Renders the reflection extraction prompt with Handlebars.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Turn conversation history and stored reflections into model input
//! - **Integration:** ReflectionExtractor → PromptTemplateEngine → ExtractionModel
//!
//! # Supported Placeholders
//!
//! - `{{agent_name}}` - Name of the agent whose own statements are ignored
//! - `{{recent_messages}}` - Recent conversation as `user: text` lines
//! - `{{reflections}}` - Every stored reflection, one per line
//! - `{{examples}}` - Few-shot examples of the expected output
//!
//! HTML escaping is disabled: the output is a model prompt, not markup.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Template Context
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionPromptContext {
    pub agent_name: String,

    pub recent_messages: String,

    /// Previously reported reflections, newline separated
    pub reflections: String,

    pub examples: String,

    /// Extra fields for custom templates
    #[serde(flatten)]
    pub extras: HashMap<String, serde_json::Value>,
}

impl ReflectionPromptContext {
    pub fn new(agent_name: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            ..Self::default()
        }
    }

    pub fn recent_messages(mut self, messages: impl Into<String>) -> Self {
        self.recent_messages = messages.into();
        self
    }

    pub fn reflections<'a>(mut self, texts: impl IntoIterator<Item = &'a str>) -> Self {
        self.reflections = texts.into_iter().collect::<Vec<_>>().join("\n");
        self
    }

    pub fn examples(mut self, examples: &[ReflectionExample]) -> Self {
        self.examples = examples
            .iter()
            .map(ReflectionExample::render)
            .collect::<Vec<_>>()
            .join("\n\n");
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Few-shot Examples
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionExample {
    /// Who is talking
    pub actors: String,
    /// `(speaker, text)` pairs
    pub messages: Vec<(String, String)>,
    /// Expected reflection
    pub outcome: String,
}

impl ReflectionExample {
    fn render(&self) -> String {
        let messages = self
            .messages
            .iter()
            .map(|(user, text)| format!("{}: {}", user, text))
            .collect::<Vec<_>>()
            .join("\n");
        let outcome = serde_json::json!([{ "text": self.outcome, "used": false }]);
        format!(
            "Actors:\n{}\n\nConversation:\n{}\n\nOutput:\n```json\n{}\n```",
            self.actors, messages, outcome
        )
    }
}

/// Built-in examples shipped with the default template
pub fn default_examples() -> Vec<ReflectionExample> {
    vec![
        ReflectionExample {
            actors: "user1: Marine biologist\nuser2: Science podcaster".to_string(),
            messages: vec![
                (
                    "user1".to_string(),
                    "Our team just tagged a great white shark off the Azores, the first one recorded there.".to_string(),
                ),
                ("user2".to_string(), "Wait, really? How long did that take?".to_string()),
                (
                    "user1".to_string(),
                    "Three seasons of trying. The tag pings every time she surfaces.".to_string(),
                ),
            ],
            outcome: "Researchers tag the first great white shark ever recorded off the Azores after three seasons of effort.".to_string(),
        },
        ReflectionExample {
            actors: "user1: Indie game developer\nuser2: Streamer".to_string(),
            messages: vec![
                (
                    "user1".to_string(),
                    "The demo crossed 100k downloads overnight, I can't believe it.".to_string(),
                ),
                ("user2".to_string(), "I'll feature it on stream tomorrow!".to_string()),
            ],
            outcome: "Indie game demo passes 100,000 downloads in a single night.".to_string(),
        },
    ]
}

// ============================================================================
// Default Template
// ============================================================================

pub const REFLECTION_TEMPLATE: &str = r#"TASK: Extract post-worthy facts from the conversation as a JSON array.

# EXAMPLES
{{examples}}
# END OF EXAMPLES

# INSTRUCTIONS
- Ignore everything said by {{agent_name}}.
- Keep news, announcements, achievements, insights and developments that a broad audience would find interesting.
- Write every entry as one or more complete sentences about one specific fact.
- Keep entries concise.
- Do not repeat anything listed under Previous Reflections.
- If nothing qualifies, return an empty array.

Recent Messages:
{{recent_messages}}

Previous Reflections:
{{reflections}}

Respond with a JSON array inside a ```json fenced block, one object per fact:
```json
[
  {"text": string, "used": boolean}
]
```"#;

// ============================================================================
// Template Engine
// ============================================================================

pub struct PromptTemplateEngine {
    handlebars: Handlebars<'static>,
}

impl PromptTemplateEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub fn render(&self, template: &str, context: &ReflectionPromptContext) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .context("Failed to render prompt template")
    }

    /// Render with an optional override, falling back to [`REFLECTION_TEMPLATE`]
    pub fn render_with_fallback(
        &self,
        template: Option<&str>,
        context: &ReflectionPromptContext,
    ) -> Result<String> {
        self.render(template.unwrap_or(REFLECTION_TEMPLATE), context)
    }

    /// Validate template syntax without rendering
    pub fn validate_template(&self, template: &str) -> Result<()> {
        handlebars::template::Template::compile(template)
            .map(|_| ())
            .context("Invalid Handlebars template syntax")
    }
}

impl Default for PromptTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}
