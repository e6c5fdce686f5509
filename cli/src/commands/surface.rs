// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Run the reflection gate for a pending action

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use tidings_core::domain::action::PendingAction;

use crate::embedded::{log_events, EmbeddedRuntime};

#[derive(Args)]
pub struct SurfaceArgs {
    /// Action being composed (POST and TWEET are posts)
    #[arg(short, long, default_value = "post")]
    pub action: String,
}

pub async fn handle_command(args: SurfaceArgs, config_path: Option<PathBuf>) -> Result<()> {
    let runtime = EmbeddedRuntime::new(config_path)?;

    let mut events = runtime.event_bus().subscribe();

    let text = runtime
        .gate()
        .surface(&PendingAction::named(&args.action))
        .await
        .context("Failed to surface reflections")?;
    log_events(&mut events);

    if text.is_empty() {
        eprintln!("{}", "No reflections to surface".dimmed());
    } else {
        println!("{}", text);
    }

    Ok(())
}
