// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! slotshm CLI
//!
//! Command-line interface for publishing to and polling slotshm channels.

use clap::{Parser, Subcommand};

mod commands;
mod payload;

/// slotshm - Single-slot shared-memory message channel
#[derive(Parser)]
#[command(name = "slotshm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "slotshm.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the channel and publish messages into it
    Publish {
        /// Text to publish, zero-padded to the payload size
        #[arg(short, long, default_value = "hello")]
        message: String,

        /// Stop after this many messages (runs until Ctrl-C if omitted)
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Delay between messages
        #[arg(short, long, default_value_t = 100)]
        interval_ms: u64,

        /// Unlink objects left by a crashed writer before creating the channel
        #[arg(long)]
        reclaim: bool,
    },

    /// Attach to the channel and print every message received
    Poll {
        /// Stop after this many messages (runs until Ctrl-C if omitted)
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Print final statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },

    /// Remove channel objects left behind by a crashed writer
    Clean,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    // Dispatch to command handlers
    match cli.command {
        Commands::Publish {
            message,
            count,
            interval_ms,
            reclaim,
        } => commands::publish::execute(&cli.config, &message, count, interval_ms, reclaim).await,
        Commands::Poll { count, json } => commands::poll::execute(&cli.config, count, json).await,
        Commands::Validate { file } => commands::validate::execute(&file).await,
        Commands::Clean => commands::clean::execute(&cli.config).await,
    }
}
