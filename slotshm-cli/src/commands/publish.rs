// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `slotshm publish` command - Own the channel and publish messages.
//!
//! The channel exists for as long as this command runs. On exit (count
//! reached or Ctrl-C) the writer is closed and every OS object unlinked.

use std::time::Duration;

use slotshm_core::{ConfigLoader, Publish, Writer};

use crate::payload;

pub async fn execute(
    config_path: &str,
    message: &str,
    count: Option<u64>,
    interval_ms: u64,
    reclaim: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let mut channel = config.channel;
    channel.reclaim_stale |= reclaim;

    let writer = Writer::from_config(&channel)?;
    tracing::info!(
        name = %writer.name(),
        size = writer.size(),
        "Channel created, publishing"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut seq: u64 = 0;

    loop {
        if count.is_some_and(|n| seq >= n) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, closing channel");
                break;
            }
            _ = ticker.tick() => {
                let buf = payload::encode(message, seq, writer.size())?;
                match writer.write(&buf)? {
                    Publish::Signaled => tracing::debug!(seq, "Published"),
                    Publish::Coalesced => tracing::debug!(seq, "Published over unread message"),
                }
                seq += 1;
            }
        }
    }

    let stats = writer.stats();
    writer.close()?;

    println!("✓ Channel closed");
    println!("  Writes:    {}", stats.writes);
    println!("  Signaled:  {}", stats.signaled);
    println!("  Coalesced: {}", stats.coalesced);
    Ok(())
}
