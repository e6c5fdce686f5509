// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

/// Process settings lookup by name
pub trait SettingsProvider: Send + Sync {
    fn get_setting(&self, name: &str) -> Option<String>;

    /// Boolean view of a setting. Absent or unrecognised values are `false`.
    fn is_enabled(&self, name: &str) -> bool {
        self.get_setting(name)
            .map(|value| parse_flag(&value).unwrap_or(false))
            .unwrap_or(false)
    }
}

/// Parse a boolean setting value. `None` when the value is not a boolean.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
