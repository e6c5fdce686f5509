// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use tidings_core::domain::agent_config::{AgentConfigManifest, CacheBackend};
use tidings_core::domain::settings::SettingsProvider;
use tidings_core::infrastructure::settings::ConfigSettings;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./tidings-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = AgentConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. TIDINGS_CONFIG_PATH: {}",
            std::env::var("TIDINGS_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./tidings-config.yaml");
        println!("  4. ~/.tidings/config.yaml");
        println!("  5. /etc/tidings/config.yaml");
        println!();
    }

    let spec = &config.spec;
    let reflections = &spec.reflections;
    let settings = ConfigSettings::new(spec.settings.clone());

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Agent:".bold());
    println!("  Manifest: {}", config.metadata.name);
    println!("  Name: {}", spec.agent.name);
    println!();

    println!("{}", "Reflections:".bold());
    let state = if settings.is_enabled(&reflections.feature_flag) {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  Feature flag: {} ({})", reflections.feature_flag, state);
    println!("  Cache key: {}", spec.reflections_cache_key());
    println!("  Turn interval: {}", reflections.turn_interval);
    println!("  Recent messages: {}", reflections.recent_message_count);
    println!("  Used flag policy: {:?}", reflections.used_flag_policy);
    println!("  Model alias: {}", reflections.model_alias);
    if reflections.prompt_template.is_some() {
        println!("  Prompt template: custom");
    }
    if let Some(max) = reflections.retention.max_used_records {
        println!("  Retention: keep at most {} used records", max);
    }
    println!();

    println!("{}", "Cache:".bold());
    match spec.cache.backend {
        CacheBackend::Memory => println!("  Backend: memory"),
        CacheBackend::File => {
            println!("  Backend: file");
            println!("  Path: {}", spec.cache_dir().display());
        }
    }
    println!();

    println!("{}", "LLM Providers:".bold());
    if spec.llm_providers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for provider in &spec.llm_providers {
        let name = if provider.enabled {
            provider.name.bold()
        } else {
            provider.name.dimmed()
        };
        println!("  {} ({})", name, provider.provider_type);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} → {}", model.alias, model.model);
        }
    }
    println!();

    println!("{}", "LLM Selection:".bold());
    println!("  Max attempts: {}", spec.llm_selection.max_attempts);
    if let Some(fallback) = &spec.llm_selection.fallback_provider {
        println!("  Fallback provider: {}", fallback);
    }
    println!();

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = AgentConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    std::fs::write(&output, sample(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}
