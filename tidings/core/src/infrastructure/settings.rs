// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashMap;

use crate::domain::settings::SettingsProvider;

/// Settings from the manifest, overridden by environment variables of the same name
#[derive(Debug, Clone, Default)]
pub struct ConfigSettings {
    values: HashMap<String, String>,
    read_env: bool,
}

impl ConfigSettings {
    /// Manifest values with environment overrides
    pub fn new(values: HashMap<String, String>) -> Self {
        Self {
            values,
            read_env: true,
        }
    }

    /// Manifest values only. Used by tests to stay independent of the environment.
    pub fn isolated(values: HashMap<String, String>) -> Self {
        Self {
            values,
            read_env: false,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl SettingsProvider for ConfigSettings {
    fn get_setting(&self, name: &str) -> Option<String> {
        if self.read_env {
            if let Ok(value) = std::env::var(name) {
                return Some(value);
            }
        }
        self.values.get(name).cloned()
    }
}
