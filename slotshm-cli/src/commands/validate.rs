// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `slotshm validate` command - Validate configuration file.

use slotshm_core::{ConfigLoader, SemaphoreRole};

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            let channel = &config.channel;
            println!("✓ Configuration is valid");
            println!();
            println!("Channel:");
            println!("  Name:            {}", channel.name);
            println!("  Payload Size:    {}", channel.payload_size);
            println!("  Reclaim Stale:   {}", channel.reclaim_stale);
            println!("  Region Object:   {}", channel.name.shm_name());
            for role in SemaphoreRole::ALL {
                println!(
                    "  Semaphore:       {} (initial {})",
                    channel.name.semaphore_name(role),
                    role.initial_value()
                );
            }
            println!();
            println!("Reader:");
            println!(
                "  Poll Interval:   {}ms",
                config.reader.poll_interval.as_millis()
            );
            println!(
                "  Attach Timeout:  {}ms",
                config.reader.attach_timeout.as_millis()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
