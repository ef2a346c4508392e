// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmframe validate` command - Validate configuration file.

use shmframe_core::ConfigLoader;

pub async fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            let layout = &config.layout;
            println!("✓ Configuration is valid");
            println!();
            println!("Segment:");
            println!("  Name:           {}", config.segment.name);
            println!("  Size:           {} bytes", layout.total_size());
            println!("  Payload Slots:  {}", layout.slots());
            println!("  Header Mode:    {}", config.header_mode);
            println!();
            println!("Frame:");
            println!(
                "  Geometry:       {}x{} (type {})",
                config.frame.rows, config.frame.cols, config.frame.type_code
            );
            println!("  Payload:        {} bytes", layout.payload_len());
            println!("  Rate:           {} Hz", config.frame.rate_hz);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
