// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM-backed extraction model
//
// Sends the composed prompt to an LLMProvider and decodes the JSON answer.
// Shape validation happens later, in parse_candidates.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::extraction::{ExtractionError, ExtractionModel};
use crate::domain::llm::{GenerationOptions, LLMProvider};

pub struct LlmExtractionModel {
    provider: Arc<dyn LLMProvider>,
    options: GenerationOptions,
}

impl LlmExtractionModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Pull the JSON payload out of a model answer: a ```json block first,
    /// then any fenced block, then the whole text.
    fn extract_json(text: &str) -> &str {
        for marker in ["```json", "```"] {
            if let Some(start) = text.find(marker) {
                let content_start = start + marker.len();
                if let Some(end_offset) = text[content_start..].find("```") {
                    return text[content_start..content_start + end_offset].trim();
                }
            }
        }
        text.trim()
    }
}

#[async_trait]
impl ExtractionModel for LlmExtractionModel {
    async fn extract(&self, prompt: &str) -> Result<serde_json::Value, ExtractionError> {
        let response = self
            .provider
            .generate(prompt, &self.options)
            .await
            .map_err(|e| ExtractionError::Model(e.to_string()))?;

        debug!(
            provider = %response.provider,
            model = %response.model,
            "Extraction model answered"
        );

        let payload = Self::extract_json(&response.text);
        serde_json::from_str(payload).map_err(|e| {
            ExtractionError::Malformed(format!("answer is not valid JSON: {}", e))
        })
    }
}
