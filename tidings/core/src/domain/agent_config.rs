// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Agent Configuration Types
//
// Kubernetes-style manifest for a Tidings agent:
// - Agent identity (scopes the reflection cache key)
// - Named settings (feature flags read at runtime)
// - Reflection pipeline tuning
// - Cache backend
// - LLM providers and model aliases
// - Logging

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::extraction::UsedFlagPolicy;
use crate::domain::reflection::RetentionPolicy;

pub const API_VERSION: &str = "tidings/v1";
pub const KIND: &str = "AgentConfig";

/// Setting consulted by both the extractor and the gate
pub const DEFAULT_FEATURE_FLAG: &str = "TWITTER_USE_DEFAULT_REFLECTIONS";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfigManifest {
    /// API version (must be "tidings/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "AgentConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: AgentConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfigSpec {
    pub agent: AgentIdentity,

    /// Named settings, overridable through environment variables of the same name
    #[serde(default)]
    pub settings: HashMap<String, String>,

    #[serde(default)]
    pub reflections: ReflectionsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub llm_providers: Vec<LLMProviderConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Agent display name. The extraction prompt tells the model to ignore
    /// facts stated by this speaker.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionsConfig {
    /// Name of the setting that enables the reflection pipeline
    #[serde(default = "default_feature_flag")]
    pub feature_flag: String,

    /// Cache key of the reflection queue (default: "<agent.name>/reflections")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    /// Extraction fires when the room's message count is a multiple of this
    #[serde(default = "default_turn_interval")]
    pub turn_interval: u64,

    /// How many recent messages go into the extraction prompt
    #[serde(default = "default_recent_message_count")]
    pub recent_message_count: usize,

    /// Handling of the `used` field on freshly extracted candidates
    #[serde(default)]
    pub used_flag_policy: UsedFlagPolicy,

    /// Model alias used for extraction
    #[serde(default = "default_model_alias")]
    pub model_alias: String,

    /// Handlebars override for the extraction prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl Default for ReflectionsConfig {
    fn default() -> Self {
        Self {
            feature_flag: default_feature_flag(),
            cache_key: None,
            turn_interval: default_turn_interval(),
            recent_message_count: default_recent_message_count(),
            used_flag_policy: UsedFlagPolicy::default(),
            model_alias: default_model_alias(),
            prompt_template: None,
            retention: RetentionPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Directory for the file backend (default: ~/.tidings/cache)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Unique provider name (e.g., "ollama-local", "openai")
    pub name: String,

    /// Provider type: "openai", "openai-compatible" or "ollama"
    #[serde(rename = "type")]
    pub provider_type: String,

    pub endpoint: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Alias referenced by `reflections.model_alias`
    pub alias: String,

    /// Model identifier for the provider API
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSelection {
    /// Provider tried once more after the primary gives up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    /// Attempts against the primary provider (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for LLMSelection {
    fn default() -> Self {
        Self {
            fallback_provider: None,
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_feature_flag() -> String {
    DEFAULT_FEATURE_FLAG.to_string()
}

fn default_turn_interval() -> u64 {
    4
}

fn default_recent_message_count() -> usize {
    32
}

fn default_model_alias() -> String {
    "default".to_string()
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::File
}

fn default_max_attempts() -> u32 {
    1
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for AgentConfigSpec {
    fn default() -> Self {
        Self {
            agent: AgentIdentity {
                name: "tidings".to_string(),
            },
            settings: HashMap::new(),
            reflections: ReflectionsConfig::default(),
            cache: CacheConfig::default(),
            llm_providers: vec![],
            llm_selection: LLMSelection::default(),
            observability: None,
        }
    }
}

impl Default for AgentConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "tidings-agent".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: AgentConfigSpec::default(),
        }
    }
}

impl AgentConfigSpec {
    /// Cache key holding this agent's reflection queue
    pub fn reflections_cache_key(&self) -> String {
        self.reflections
            .cache_key
            .clone()
            .unwrap_or_else(|| format!("{}/reflections", self.agent.name))
    }

    /// Directory used by the file cache backend
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache.path {
            Some(path) => expand_home(path),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tidings")
                .join("cache"),
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        self.observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

impl AgentConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. TIDINGS_CONFIG_PATH environment variable
    /// 2. ./tidings-config.yaml
    /// 3. ~/.tidings/config.yaml
    /// 4. /etc/tidings/config.yaml (Unix) or C:\ProgramData\Tidings\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("TIDINGS_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./tidings-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tidings").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/tidings/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Tidings\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment overrides for container deployments. Named settings are
    /// resolved against the environment at lookup time instead.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TIDINGS_CACHE_PATH") {
            tracing::info!("Environment override: TIDINGS_CACHE_PATH={}", path);
            self.spec.cache.path = Some(path);
        }

        if let Ok(backend) = std::env::var("TIDINGS_CACHE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.spec.cache.backend = CacheBackend::Memory,
                "file" => self.spec.cache.backend = CacheBackend::File,
                _ => tracing::warn!(
                    "Invalid value for TIDINGS_CACHE_BACKEND: '{}'. Expected memory/file. Ignoring.",
                    backend
                ),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.agent.name.trim().is_empty() {
            anyhow::bail!("spec.agent.name cannot be empty");
        }

        let reflections = &self.spec.reflections;
        if reflections.turn_interval == 0 {
            anyhow::bail!("spec.reflections.turn_interval must be greater than 0");
        }
        if reflections.feature_flag.trim().is_empty() {
            anyhow::bail!("spec.reflections.feature_flag cannot be empty");
        }
        if let Some(key) = &reflections.cache_key {
            if key.trim().is_empty() {
                anyhow::bail!("spec.reflections.cache_key cannot be empty when set");
            }
        }

        for provider in &self.spec.llm_providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }
            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }
            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }
            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }
                if model.model.is_empty() {
                    anyhow::bail!("Model identifier cannot be empty for alias: {}", model.alias);
                }
            }
        }

        if let Some(fallback) = &self.spec.llm_selection.fallback_provider {
            if !self.spec.llm_providers.iter().any(|p| &p.name == fallback) {
                anyhow::bail!("Fallback provider '{}' not found in llm_providers", fallback);
            }
        }

        if self.spec.llm_selection.max_attempts == 0 {
            anyhow::bail!("spec.llm_selection.max_attempts must be at least 1");
        }

        let enabled: Vec<_> = self.spec.llm_providers.iter().filter(|p| p.enabled).collect();
        if !enabled.is_empty()
            && !enabled
                .iter()
                .flat_map(|p| p.models.iter())
                .any(|m| m.alias == reflections.model_alias)
        {
            anyhow::bail!(
                "Model alias '{}' is not provided by any enabled LLM provider",
                reflections.model_alias
            );
        }

        Ok(())
    }
}
