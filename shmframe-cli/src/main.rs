// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmframe CLI
//!
//! Publish frames into a shared memory segment and inspect them from another
//! process.

use clap::{Parser, Subcommand};

mod commands;

/// shmframe - zero-copy frame exchange over shared memory
#[derive(Parser)]
#[command(name = "shmframe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "shmframe.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the segment and publish test-pattern frames
    Publish {
        /// Stop after this many frames (default: until interrupted)
        #[arg(short, long)]
        frames: Option<u64>,
    },

    /// Read the current frame from an existing segment
    Inspect {
        /// Print the frame description as JSON
        #[arg(long)]
        json: bool,

        /// Keep printing once per second until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Publish { frames } => commands::publish::execute(&cli.config, frames).await,
        Commands::Inspect { json, watch } => {
            commands::inspect::execute(&cli.config, json, watch).await
        }
        Commands::Validate { file } => commands::validate::execute(&file).await,
    }
}
