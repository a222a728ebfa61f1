// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `slotshm clean` command - Remove stale channel objects.
//!
//! A writer that crashed never unlinks its region or semaphores, and the
//! next writer would reuse their leftover values.

use slotshm_core::shm::unlink_channel;
use slotshm_core::ConfigLoader;

pub async fn execute(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let name = &config.channel.name;

    tracing::info!(name = %name, "Removing channel objects");
    let removed = unlink_channel(name);

    if removed.is_empty() {
        println!("Nothing to clean for channel '{}'", name);
    } else {
        println!("✓ Removed {} object(s):", removed.len());
        for object in &removed {
            println!("  - {}", object);
        }
    }
    Ok(())
}
