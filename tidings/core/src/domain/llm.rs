// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Language model port used by the reflection extractor.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Vendor-neutral text generation interface

// Adapters live in infrastructure/llm/. The extractor never talks to a vendor
// API directly; it goes through ExtractionModel, which is backed by one of
// these providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError>;

    /// Check if provider is reachable
    async fn health_check(&self) -> Result<(), LLMError>;
}

/// Options for LLM generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(2048),
            temperature: Some(0.4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,

    /// Provider type that produced the answer ("openai", "ollama")
    pub provider: String,

    pub model: String,

    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl LLMError {
    /// Map a non-success HTTP status onto an error.
    pub fn from_status(status: u16, body: String, model: &str) -> Self {
        match status {
            401 | 403 => LLMError::Authentication(body),
            404 => LLMError::ModelNotFound(model.to_string()),
            429 => LLMError::RateLimit,
            _ => LLMError::Provider(format!("HTTP {}: {}", status, body)),
        }
    }
}
