// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `slotshm poll` command - Attach to a channel and print messages.
//!
//! Attaching retries while the writer has not finished creating the channel,
//! up to the configured attach timeout.

use std::time::Instant;

use slotshm_core::{ChannelConfig, ConfigLoader, Reader, ReaderConfig, SlotshmResult};

use crate::payload;

pub async fn execute(
    config_path: &str,
    count: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let reader = attach(&config.channel, &config.reader).await?;

    tracing::info!(name = %reader.name(), size = reader.size(), "Attached, polling");

    let mut ticker = tokio::time::interval(config.reader.poll_interval);
    let mut buf = vec![0u8; reader.size()];
    let mut received: u64 = 0;

    loop {
        if count.is_some_and(|n| received >= n) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, detaching");
                break;
            }
            _ = ticker.tick() => {
                if reader.read(&mut buf)? {
                    received += 1;
                    println!("{}", payload::decode(&buf));
                }
            }
        }
    }

    let stats = reader.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("✓ Detached");
        println!("  Delivered:   {}", stats.delivered);
        println!("  Empty polls: {}", stats.empty_polls);
    }
    Ok(())
}

/// Open the reader, retrying while the channel is missing or unsized until
/// the attach timeout.
async fn attach(channel: &ChannelConfig, settings: &ReaderConfig) -> SlotshmResult<Reader> {
    let deadline = Instant::now() + settings.attach_timeout;
    loop {
        match Reader::from_config(channel) {
            Ok(reader) => return Ok(reader),
            Err(e) if e.is_not_ready() && Instant::now() < deadline => {
                tracing::debug!(
                    name = %channel.name,
                    error = %e,
                    "Channel not ready yet, retrying"
                );
                tokio::time::sleep(settings.poll_interval).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
