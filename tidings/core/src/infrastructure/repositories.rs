// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Cache-backed reflection store
//!
//! The whole queue is one JSON array under a single cache key. Atomic
//! operations (`append`, `take_unused`) hold a per-key async mutex for the
//! full read-modify-write cycle. The mutex comes from a shared [`KeyedLocks`]
//! registry, so every store handle on the same key serializes against the
//! others. Locks are process-local.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::cache::{CacheError, CacheStore};
use crate::domain::reflection::{Reflection, ReflectionQueue, RetentionPolicy};
use crate::domain::repository::{ReflectionStore, RepositoryError};

/// Registry of one async mutex per cache key
#[derive(Clone, Default)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

/// Reflection store over a generic [`CacheStore`]
#[derive(Clone)]
pub struct CacheReflectionStore {
    cache: Arc<dyn CacheStore>,
    key: String,
    locks: KeyedLocks,
    retention: RetentionPolicy,
}

impl CacheReflectionStore {
    pub fn new(cache: Arc<dyn CacheStore>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
            locks: KeyedLocks::new(),
            retention: RetentionPolicy::unbounded(),
        }
    }

    /// Share a lock registry with other stores on the same cache
    pub fn with_locks(mut self, locks: KeyedLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Option<ReflectionQueue>, RepositoryError> {
        let value = match self.cache.get(&self.key).await {
            Ok(value) => value,
            Err(CacheError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        value
            .map(serde_json::from_value::<ReflectionQueue>)
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn store(&self, queue: &ReflectionQueue) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(queue)?;
        self.cache.set(&self.key, value).await?;
        Ok(())
    }
}

#[async_trait]
impl ReflectionStore for CacheReflectionStore {
    async fn get(&self) -> Result<Option<ReflectionQueue>, RepositoryError> {
        self.load().await
    }

    async fn set(&self, queue: &ReflectionQueue) -> Result<(), RepositoryError> {
        let _guard = self.locks.acquire(&self.key).await;
        self.store(queue).await
    }

    async fn append(&self, reflections: Vec<Reflection>) -> Result<ReflectionQueue, RepositoryError> {
        let _guard = self.locks.acquire(&self.key).await;

        let mut queue = self.load().await?.unwrap_or_default();
        let appended = reflections.len();
        queue.append(reflections);

        let dropped = queue.compact(&self.retention);
        if dropped > 0 {
            debug!(key = %self.key, dropped, "Retention dropped used reflections");
        }

        self.store(&queue).await?;
        debug!(key = %self.key, appended, queue_len = queue.len(), "Reflections appended");
        Ok(queue)
    }

    async fn take_unused(&self) -> Result<Vec<Reflection>, RepositoryError> {
        let _guard = self.locks.acquire(&self.key).await;

        let Some(mut queue) = self.load().await? else {
            return Ok(Vec::new());
        };

        if queue.unused_count() == 0 {
            return Ok(Vec::new());
        }

        let surfaced = queue.mark_all_used();
        self.store(&queue).await?;
        debug!(key = %self.key, surfaced = surfaced.len(), "Reflections marked used");
        Ok(surfaced)
    }
}
