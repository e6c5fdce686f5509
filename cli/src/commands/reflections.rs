// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Inspect the stored reflection queue

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use tidings_core::domain::reflection::Reflection;

use crate::embedded::EmbeddedRuntime;

#[derive(Subcommand)]
pub enum ReflectionsCommand {
    /// List stored reflections
    List {
        /// Only show reflections not surfaced yet
        #[arg(long)]
        unused: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(
    command: ReflectionsCommand,
    config_path: Option<PathBuf>,
) -> Result<()> {
    match command {
        ReflectionsCommand::List { unused, json } => list(config_path, unused, json).await,
    }
}

async fn list(config_path: Option<PathBuf>, only_unused: bool, as_json: bool) -> Result<()> {
    let runtime = EmbeddedRuntime::new(config_path)?;
    let queue = runtime
        .store()
        .get()
        .await
        .context("Failed to read reflection queue")?
        .unwrap_or_default();

    let records: Vec<&Reflection> = queue
        .iter()
        .filter(|r| !only_unused || !r.is_used())
        .collect();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{}", "No reflections stored".dimmed());
        return Ok(());
    }

    println!(
        "{} ({} total, {} unused)",
        runtime.spec().reflections_cache_key().bold(),
        queue.len(),
        queue.unused_count()
    );
    for record in records {
        let marker = if record.is_used() {
            "used".dimmed()
        } else {
            "new ".green()
        };
        println!("  [{}] {}", marker, record.text());
    }

    Ok(())
}
