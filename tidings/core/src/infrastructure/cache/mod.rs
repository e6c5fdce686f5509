// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Cache backends for the reflection store
//!
//! - `InMemoryCacheStore`: process-lifetime cache, used by tests and embedded setups
//! - `FileCacheStore`: one JSON file per key, lets CLI invocations share state

pub mod file;
pub mod memory;

use std::sync::Arc;

use crate::domain::agent_config::{AgentConfigSpec, CacheBackend};
use crate::domain::cache::{CacheError, CacheStore};

pub use file::FileCacheStore;
pub use memory::InMemoryCacheStore;

/// Build the cache backend selected in configuration
pub fn cache_from_config(spec: &AgentConfigSpec) -> Result<Arc<dyn CacheStore>, CacheError> {
    match spec.cache.backend {
        CacheBackend::Memory => Ok(Arc::new(InMemoryCacheStore::new())),
        CacheBackend::File => Ok(Arc::new(FileCacheStore::new(spec.cache_dir())?)),
    }
}
