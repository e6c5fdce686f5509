// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem Cache
//!
//! Stores each cache entry as `<base>/<escaped key>.json`. Writes go to a
//! temporary sibling first and are renamed into place, so a reader never sees
//! a half-written queue.
//!
//! **Limitations:**
//! - No cross-process locking: two processes writing the same key race
//! - No fsync; a crash can lose the last write

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::cache::{CacheError, CacheStore};

pub struct FileCacheStore {
    base_path: PathBuf,
}

impl FileCacheStore {
    /// Create the store, creating `base_path` if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            CacheError::Io(format!(
                "Failed to create cache directory {}: {}",
                base_path.display(),
                e
            ))
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", escape_key(key)))
    }
}

/// Percent-escape everything outside `[A-Za-z0-9._-]` so distinct keys map to
/// distinct file names.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                escaped.push(byte as char)
            }
            _ => escaped.push_str(&format!("%{:02X}", byte)),
        }
    }
    escaped
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let path = self.entry_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let value = serde_json::from_slice(&bytes)?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&value)?;

        tokio::fs::write(&tmp_path, &bytes).await.map_err(|e| {
            CacheError::Io(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            CacheError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        tracing::debug!(key, path = %path.display(), "Cache entry written");
        Ok(())
    }
}
