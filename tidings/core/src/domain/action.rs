// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

/// Kind of action the agent is about to take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Publish a post on the social network
    Post,
    /// Anything else (reply, like, follow, ...)
    Other(String),
}

impl ActionKind {
    /// Map a client action name onto a kind. `POST` and `TWEET` are posts.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "POST" | "TWEET" => ActionKind::Post,
            _ => ActionKind::Other(name.to_string()),
        }
    }

    pub fn is_post(&self) -> bool {
        matches!(self, ActionKind::Post)
    }
}

/// Action being composed when the post-composition hook runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
}

impl PendingAction {
    pub fn post() -> Self {
        Self {
            kind: ActionKind::Post,
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            kind: ActionKind::from_name(name),
        }
    }
}
