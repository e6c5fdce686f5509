// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Extraction Contract
//!
//! The extraction model is a black box: it receives a composed prompt and
//! answers with a JSON array of `{"text": string, "used": boolean}` objects.
//! This module owns the shape check of that answer ([`parse_candidates`]) and
//! the policy for the `used` field of fresh candidates ([`UsedFlagPolicy`]).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Port for the extraction function and its response contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::reflection::Reflection;

/// Turns a composed prompt into raw candidate reflections
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Returns the decoded JSON answer, unvalidated.
    async fn extract(&self, prompt: &str) -> Result<serde_json::Value, ExtractionError>;
}

/// What to do with the `used` field the model emits on fresh candidates.
///
/// The model may legitimately mark a fact as already covered, or it may emit
/// `true` by mistake and hide a reflection from the gate forever. Both readings
/// are possible, so the choice is left to configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsedFlagPolicy {
    /// Keep the model's `used` value verbatim.
    #[default]
    PassThrough,

    /// Store every fresh candidate as unused.
    ForceUnused,
}

impl UsedFlagPolicy {
    pub fn apply(self, candidates: Vec<Reflection>) -> Vec<Reflection> {
        match self {
            UsedFlagPolicy::PassThrough => candidates,
            UsedFlagPolicy::ForceUnused => candidates
                .into_iter()
                .map(|c| Reflection::new(c.into_text()))
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction model failed: {0}")]
    Model(String),

    #[error("Malformed extraction output: {0}")]
    Malformed(String),
}

/// Validate a model answer and convert it into reflections.
///
/// Any deviation from an array of `{text, used}` objects with non-empty text
/// fails the whole answer.
pub fn parse_candidates(value: serde_json::Value) -> Result<Vec<Reflection>, ExtractionError> {
    if !value.is_array() {
        return Err(ExtractionError::Malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&value)
        )));
    }

    let candidates: Vec<Reflection> = serde_json::from_value(value)
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    if let Some(index) = candidates.iter().position(|c| c.text().trim().is_empty()) {
        return Err(ExtractionError::Malformed(format!(
            "candidate {} has empty text",
            index
        )));
    }

    Ok(candidates)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
