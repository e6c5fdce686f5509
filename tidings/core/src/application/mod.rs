// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod error;
pub mod plugin;
pub mod reflection_extractor;
pub mod reflection_gate;

pub use error::ReflectionError;
pub use plugin::ReflectionsPlugin;
pub use reflection_extractor::{ExtractionOutcome, ReflectionExtractor};
pub use reflection_gate::ReflectionGate;
