// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::conversation::ConversationError;
use crate::domain::extraction::ExtractionError;
use crate::domain::repository::RepositoryError;

/// Failure of an extraction run or a gate call
#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),
}
