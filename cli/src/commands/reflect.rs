// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Run reflection extraction over a conversation transcript

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use tidings_core::infrastructure::conversation::Transcript;

use crate::embedded::{log_events, EmbeddedRuntime};

#[derive(Args)]
pub struct ReflectArgs {
    /// Conversation transcript (JSON, or YAML by extension)
    #[arg(short, long, value_name = "FILE")]
    pub transcript: PathBuf,

    /// Skip the turn cadence check (the feature flag still applies)
    #[arg(long)]
    pub force: bool,
}

pub async fn handle_command(args: ReflectArgs, config_path: Option<PathBuf>) -> Result<()> {
    let transcript = Transcript::from_file(&args.transcript)
        .with_context(|| format!("Failed to read transcript {:?}", args.transcript))?;
    let message_count = transcript.messages.len();

    let runtime = EmbeddedRuntime::new(config_path)?;
    let room_id = runtime.conversations().load_transcript(transcript).await;
    info!(room_id = %room_id, message_count, "Transcript loaded");

    let extractor = runtime.extractor(runtime.extraction_model()?);
    let mut events = runtime.event_bus().subscribe();

    let result = if args.force {
        extractor.run(room_id).await
    } else {
        extractor.on_turn(room_id).await
    };
    log_events(&mut events);
    let outcome = result.context("Reflection extraction failed")?;

    let reflections = &runtime.spec().reflections;
    match outcome {
        Some(outcome) => println!(
            "{}",
            format!(
                "✓ Extracted {} reflection(s), queue now holds {}",
                outcome.appended, outcome.queue_len
            )
            .green()
        ),
        None if !runtime.reflections_enabled() => println!(
            "{}",
            format!(
                "Reflections are disabled (flag '{}' is not set to a truthy value)",
                reflections.feature_flag
            )
            .yellow()
        ),
        None => println!(
            "{}",
            format!(
                "Trigger did not fire for {} message(s) (interval {}). Use --force to run anyway.",
                message_count, reflections.turn_interval
            )
            .yellow()
        ),
    }

    Ok(())
}
