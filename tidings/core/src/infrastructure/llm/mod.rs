// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Adapters
//
// Concrete LLMProvider implementations plus the alias registry.

pub mod ollama;
pub mod openai;
pub mod registry;

pub use ollama::OllamaAdapter;
pub use openai::OpenAIAdapter;
pub use registry::{BoundModel, ProviderRegistry};
