// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tidings Core
//!
//! Reflection lifecycle for social agents: an extractor distills post-worthy
//! facts from conversations into a persistent queue, and a gate hands the
//! unused ones to the next post exactly once.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, application services and adapters

pub mod domain;
pub mod application;
pub mod infrastructure;
