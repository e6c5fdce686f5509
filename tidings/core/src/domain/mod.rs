// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Domain model and ports of the reflection lifecycle.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Reflection aggregate and collaborator interfaces

pub mod action;
pub mod agent_config;
pub mod cache;
pub mod conversation;
pub mod events;
pub mod extraction;
pub mod llm;
pub mod reflection;
pub mod repository;
pub mod settings;
