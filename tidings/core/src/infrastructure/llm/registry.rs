// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Model Alias Resolution and Provider Management
//
// Resolves model aliases from the manifest to provider adapters, with
// bounded retries and an optional fallback provider.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::agent_config::{AgentConfigSpec, LLMProviderConfig, ModelConfig};
use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider};

use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

struct AliasBinding {
    provider_name: String,
    provider: Arc<dyn LLMProvider>,
    model: ModelConfig,
}

pub struct ProviderRegistry {
    aliases: HashMap<String, AliasBinding>,
    /// provider name -> adapter for that provider's first model
    fallbacks: HashMap<String, Arc<dyn LLMProvider>>,
    fallback_provider: Option<String>,
    max_attempts: u32,
    retry_delay_ms: u64,
}

impl ProviderRegistry {
    /// Empty registry with the given retry behaviour
    pub fn new(max_attempts: u32, retry_delay_ms: u64) -> Self {
        Self {
            aliases: HashMap::new(),
            fallbacks: HashMap::new(),
            fallback_provider: None,
            max_attempts: max_attempts.max(1),
            retry_delay_ms,
        }
    }

    pub fn from_config(config: &AgentConfigSpec) -> anyhow::Result<Self> {
        let selection = &config.llm_selection;
        let mut registry = Self::new(selection.max_attempts, selection.retry_delay_ms);
        registry.fallback_provider = selection.fallback_provider.clone();

        info!("Initializing LLM provider registry");

        for provider_config in &config.llm_providers {
            if !provider_config.enabled {
                info!("Provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            let api_key = match Self::resolve_api_key(&provider_config.api_key) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Failed to initialize provider '{}': {}", provider_config.name, e);
                    continue;
                }
            };

            for (index, model) in provider_config.models.iter().enumerate() {
                let adapter = match Self::create_provider(provider_config, &api_key, &model.model) {
                    Ok(adapter) => adapter,
                    Err(e) => {
                        warn!("Failed to initialize provider '{}': {}", provider_config.name, e);
                        break;
                    }
                };

                info!(
                    "Mapping alias '{}' -> {} ({})",
                    model.alias, model.model, provider_config.name
                );

                if index == 0 {
                    registry
                        .fallbacks
                        .insert(provider_config.name.clone(), adapter.clone());
                }
                registry.aliases.insert(
                    model.alias.clone(),
                    AliasBinding {
                        provider_name: provider_config.name.clone(),
                        provider: adapter,
                        model: model.clone(),
                    },
                );
            }
        }

        if registry.aliases.is_empty() {
            warn!("No LLM providers configured - reflection extraction will fail");
        }

        Ok(registry)
    }

    fn create_provider(
        config: &LLMProviderConfig,
        api_key: &str,
        model: &str,
    ) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let provider: Arc<dyn LLMProvider> = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key.to_string(),
                model.to_string(),
            )),
            "ollama" => Arc::new(OllamaAdapter::new(config.endpoint.clone(), model.to_string())),
            other => anyhow::bail!("Unsupported provider type: {}", other),
        };
        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key.as_deref() {
            Some(k) => match k.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
                None => Ok(k.to_string()),
            },
            // Local providers without auth
            None => Ok(String::new()),
        }
    }

    /// Register an adapter under an alias directly
    pub fn register(
        &mut self,
        provider_name: impl Into<String>,
        model: ModelConfig,
        provider: Arc<dyn LLMProvider>,
    ) {
        let provider_name = provider_name.into();
        self.fallbacks
            .entry(provider_name.clone())
            .or_insert_with(|| provider.clone());
        self.aliases.insert(
            model.alias.clone(),
            AliasBinding {
                provider_name,
                provider,
                model,
            },
        );
    }

    pub fn set_fallback_provider(&mut self, name: Option<String>) {
        self.fallback_provider = name;
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.aliases.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Generate text using a model alias, retrying and then falling back
    pub async fn generate(
        &self,
        alias: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let binding = self
            .aliases
            .get(alias)
            .ok_or_else(|| LLMError::ModelNotFound(format!("Model alias '{}' not found", alias)))?;

        let options = GenerationOptions {
            max_tokens: binding.model.max_tokens.or(options.max_tokens),
            temperature: binding.model.temperature.or(options.temperature),
        };

        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            match binding.provider.generate(prompt, &options).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        "Generation via '{}' failed (attempt {}/{}): {}",
                        binding.provider_name,
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    last_error = Some(e);

                    if attempt + 1 < self.max_attempts {
                        tokio::time::sleep(Duration::from_millis(
                            self.retry_delay_ms.saturating_mul(2_u64.saturating_pow(attempt)),
                        ))
                        .await;
                    }
                }
            }
        }

        if let Some(fallback) = &self.fallback_provider {
            if fallback != &binding.provider_name {
                if let Some(provider) = self.fallbacks.get(fallback) {
                    info!("Trying fallback provider: {}", fallback);
                    return provider.generate(prompt, &options).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Provider("No attempts were made".into())))
    }

    /// Pin an alias, producing a provider usable wherever one adapter is expected
    pub fn bind(self: &Arc<Self>, alias: impl Into<String>) -> Result<BoundModel, LLMError> {
        let alias = alias.into();
        if !self.has_alias(&alias) {
            return Err(LLMError::ModelNotFound(format!(
                "Model alias '{}' not found",
                alias
            )));
        }
        Ok(BoundModel {
            registry: Arc::clone(self),
            alias,
        })
    }
}

/// A registry alias exposed as a single [`LLMProvider`]
#[derive(Clone)]
pub struct BoundModel {
    registry: Arc<ProviderRegistry>,
    alias: String,
}

impl BoundModel {
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

#[async_trait]
impl LLMProvider for BoundModel {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        self.registry.generate(&self.alias, prompt, options).await
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        match self.registry.aliases.get(&self.alias) {
            Some(binding) => binding.provider.health_check().await,
            None => Err(LLMError::ModelNotFound(self.alias.clone())),
        }
    }
}
