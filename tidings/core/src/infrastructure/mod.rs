// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod cache;
pub mod conversation;
pub mod event_bus;
pub mod llm;
pub mod llm_extraction;
pub mod prompt_template_engine;
pub mod repositories;
pub mod settings;
