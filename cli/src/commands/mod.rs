// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the tidings CLI

pub mod config;
pub mod reflect;
pub mod reflections;
pub mod surface;

pub use self::config::ConfigCommand;
pub use self::reflect::ReflectArgs;
pub use self::reflections::ReflectionsCommand;
pub use self::surface::SurfaceArgs;
