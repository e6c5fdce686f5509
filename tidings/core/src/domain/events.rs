// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::conversation::RoomId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReflectionEvent {
    ReflectionsExtracted {
        room_id: RoomId,
        appended: usize,
        queue_len: usize,
        extracted_at: DateTime<Utc>,
    },
    ExtractionFailed {
        room_id: RoomId,
        reason: String,
        failed_at: DateTime<Utc>,
    },
    ReflectionsSurfaced {
        count: usize,
        surfaced_at: DateTime<Utc>,
    },
}
