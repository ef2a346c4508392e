// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmframe inspect` command - Act as a consumer of a frame exchange.
//!
//! Opens the segment created by `shmframe publish`, reads the header and
//! copies the frame it names out of this process's mapping.

use std::time::Duration;

use shmframe_core::frame::copy_published;
use shmframe_core::shm::SharedMemoryRegion;
use shmframe_core::{ConfigLoader, FrameRecord};

pub async fn execute(
    config_path: &str,
    json: bool,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let region = SharedMemoryRegion::open(&config.segment.name, config.layout.total_size())?;
    let record = config.header_mode.record_in(&region)?;

    tracing::debug!(
        segment = %config.segment.name,
        mode = %config.header_mode,
        "Inspecting segment"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        report(&region, record, json)?;

        if !watch {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = &mut shutdown => return Ok(()),
        }
    }
}

fn report(
    region: &SharedMemoryRegion,
    record: &dyn FrameRecord,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // The producer keeps running, so copy the frame out instead of viewing
    // it in place.
    let Some(frame) = copy_published(region, record)? else {
        if json {
            println!("{}", serde_json::json!({ "published": false }));
        } else {
            println!("No frame published yet");
        }
        return Ok(());
    };

    if json {
        let report = serde_json::json!({
            "published": true,
            "header": frame.header,
            "sample": frame.sample,
            "payload_len": frame.data.len(),
            "checksum": frame.checksum(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "frame {:>8}  t={:>10.3}s  {}x{} type {}  data {}  sample {}  crc32 {:#010x}",
            frame.sample.count,
            Duration::from_micros(frame.sample.time_micros).as_secs_f64(),
            frame.header.rows,
            frame.header.cols,
            frame.header.type_code,
            frame.header.data,
            frame.header.sample,
            frame.checksum()
        );
    }

    Ok(())
}
