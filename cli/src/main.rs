// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Tidings CLI
//!
//! The `tidings` binary drives the reflection lifecycle from the shell.
//!
//! ## Commands
//!
//! - `tidings config show|validate|generate` - Configuration management
//! - `tidings reflect --transcript FILE` - Extract reflections from a conversation
//! - `tidings surface` - Hand unused reflections to a post
//! - `tidings reflections list` - Inspect the stored queue

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use tidings_cli::commands::{self, ConfigCommand, ReflectArgs, ReflectionsCommand, SurfaceArgs};
use tidings_core::domain::agent_config::{AgentConfigManifest, LoggingConfig};

/// Tidings - Post-worthy facts from agent conversations
#[derive(Parser)]
#[command(name = "tidings")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TIDINGS_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Defaults to the config file.
    #[arg(long, global = true, env = "TIDINGS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json). Defaults to the config file.
    #[arg(long, global = true, env = "TIDINGS_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Extract reflections from a conversation transcript
    #[command(name = "reflect")]
    Reflect(ReflectArgs),

    /// Surface unused reflections for a pending action
    #[command(name = "surface")]
    Surface(SurfaceArgs),

    /// Inspect stored reflections
    #[command(name = "reflections")]
    Reflections {
        #[command(subcommand)]
        command: ReflectionsCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&resolve_logging(&cli))?;

    match cli.command {
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Reflect(args)) => commands::reflect::handle_command(args, cli.config).await,
        Some(Commands::Surface(args)) => commands::surface::handle_command(args, cli.config).await,
        Some(Commands::Reflections { command }) => {
            commands::reflections::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Flags win over the config file's observability section
fn resolve_logging(cli: &Cli) -> LoggingConfig {
    let from_config = || {
        AgentConfigManifest::load_or_default(cli.config.clone())
            .map(|manifest| manifest.spec.logging())
            .unwrap_or_default()
    };

    match (&cli.log_level, &cli.log_format) {
        (Some(level), Some(format)) => LoggingConfig {
            level: level.clone(),
            format: format.clone(),
        },
        (level, format) => {
            let config = from_config();
            LoggingConfig {
                level: level.clone().unwrap_or(config.level),
                format: format.clone().unwrap_or(config.format),
            }
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&logging.level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}
