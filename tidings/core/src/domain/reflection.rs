// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reflection Aggregate
//!
//! A [`Reflection`] is one post-worthy fact extracted from a conversation. The
//! [`ReflectionQueue`] is the ordered log of every reflection an agent has
//! produced, stored as a single value under one cache key.
//!
//! ## Lifecycle
//!
//! ```text
//! extracted (used = false) ──surfaced by the gate──▶ used = true
//! ```
//!
//! The `used` flag is monotonic: this module exposes [`Reflection::mark_used`]
//! and nothing that clears it. Records are appended, flipped, and only ever
//! removed by an explicitly configured [`RetentionPolicy`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Reflection record, queue and retention rules

use serde::{Deserialize, Serialize};

/// A single extracted fact waiting to be folded into an outgoing post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Natural-language statement. Older stores wrote this as `reflection`.
    #[serde(alias = "reflection")]
    text: String,

    /// Whether the reflection has already been surfaced to a post.
    used: bool,
}

impl Reflection {
    /// Create a fresh, never-surfaced reflection.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used: false,
        }
    }

    /// Rebuild a reflection with an explicit flag, e.g. from extraction output.
    pub fn from_parts(text: impl Into<String>, used: bool) -> Self {
        Self {
            text: text.into(),
            used,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Flag the reflection as surfaced. Irreversible.
    pub fn mark_used(&mut self) {
        self.used = true;
    }

    /// Consume the record, keeping only its text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Insertion-ordered log of reflections for one agent identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReflectionQueue {
    reflections: Vec<Reflection>,
}

impl ReflectionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reflections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reflection> {
        self.reflections.iter()
    }

    /// Append records at the tail, preserving their order.
    pub fn append(&mut self, reflections: impl IntoIterator<Item = Reflection>) {
        self.reflections.extend(reflections);
    }

    /// Records not yet surfaced, in insertion order.
    pub fn unused(&self) -> impl Iterator<Item = &Reflection> {
        self.reflections.iter().filter(|r| !r.is_used())
    }

    pub fn unused_count(&self) -> usize {
        self.unused().count()
    }

    /// Flip every record to used, returning the ones that were unused before.
    ///
    /// The flip covers the whole queue, not only the returned records.
    pub fn mark_all_used(&mut self) -> Vec<Reflection> {
        let surfaced: Vec<Reflection> = self.unused().cloned().collect();
        for reflection in &mut self.reflections {
            reflection.mark_used();
        }
        surfaced
    }

    /// Texts of all records, used or not. Feeds the "previous reflections"
    /// section of the extraction prompt.
    pub fn texts(&self) -> Vec<&str> {
        self.reflections.iter().map(Reflection::text).collect()
    }

    /// Apply a retention policy. Returns the number of records dropped.
    pub fn compact(&mut self, policy: &RetentionPolicy) -> usize {
        let Some(max_used) = policy.max_used_records else {
            return 0;
        };

        let used_total = self.reflections.iter().filter(|r| r.is_used()).count();
        let mut to_drop = used_total.saturating_sub(max_used);
        if to_drop == 0 {
            return 0;
        }

        let dropped = to_drop;
        // Oldest used records go first; unused ones are never dropped.
        self.reflections.retain(|r| {
            if to_drop > 0 && r.is_used() {
                to_drop -= 1;
                false
            } else {
                true
            }
        });
        dropped
    }
}

impl From<Vec<Reflection>> for ReflectionQueue {
    fn from(reflections: Vec<Reflection>) -> Self {
        Self { reflections }
    }
}

impl IntoIterator for ReflectionQueue {
    type Item = Reflection;
    type IntoIter = std::vec::IntoIter<Reflection>;

    fn into_iter(self) -> Self::IntoIter {
        self.reflections.into_iter()
    }
}

/// Opt-in bound on queue growth for long-running deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep at most this many used records (oldest dropped first).
    /// `None` keeps the queue as an unbounded append log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_used_records: Option<usize>,
}

impl RetentionPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn keep_used(max_used_records: usize) -> Self {
        Self {
            max_used_records: Some(max_used_records),
        }
    }
}
