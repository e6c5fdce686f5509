// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reflection Store Interface
//!
//! Persistence contract for the [`ReflectionQueue`] aggregate. The interface
//! lives in the domain layer and is implemented in
//! `crate::infrastructure::repositories` on top of a [`CacheStore`].
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `get` | Current queue, `None` when nothing was ever stored |
//! | `set` | Overwrite the whole queue verbatim |
//! | `append` | Atomic read-extend-write |
//! | `take_unused` | Atomic read-flip-write, returns the previously unused records |
//!
//! `append` and `take_unused` exist so that the extractor and the gate never
//! write back a stale copy of the queue: both run their read-modify-write
//! cycle while holding a per-key lock.
//!
//! [`CacheStore`]: crate::domain::cache::CacheStore

use async_trait::async_trait;

use crate::domain::cache::CacheError;
use crate::domain::reflection::{Reflection, ReflectionQueue};

/// Repository interface for the reflection queue
#[async_trait]
pub trait ReflectionStore: Send + Sync {
    /// Read the stored queue
    async fn get(&self) -> Result<Option<ReflectionQueue>, RepositoryError>;

    /// Overwrite the stored queue
    async fn set(&self, queue: &ReflectionQueue) -> Result<(), RepositoryError>;

    /// Append records to the canonical queue and persist it.
    /// Writes even when `reflections` is empty. Returns the persisted queue.
    async fn append(&self, reflections: Vec<Reflection>) -> Result<ReflectionQueue, RepositoryError>;

    /// Mark every record used and return those that were unused.
    /// Performs no write when the queue is absent or holds no unused record.
    async fn take_unused(&self) -> Result<Vec<Reflection>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<CacheError> for RepositoryError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound(key) => RepositoryError::NotFound(key),
            CacheError::Serialization(msg) => RepositoryError::Serialization(msg),
            CacheError::Io(msg) | CacheError::Backend(msg) => RepositoryError::Storage(msg),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
