// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Cache Port - Generic key/value collaborator
//
// The reflection store sits on top of a plain keyed cache. Implementations
// live in infrastructure/cache/.

use async_trait::async_trait;

/// Generic keyed cache holding JSON values.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError>;
}

/// Errors raised by cache backends
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache key not found: {0}")]
    NotFound(String),

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}
