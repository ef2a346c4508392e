// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `shmframe publish` command - Act as the producer of a frame exchange.
//!
//! Creates the segment, then publishes a moving test pattern at the
//! configured rate. Payload slots are used round-robin so a consumer reading
//! the previous frame is not overwritten by the next one.

use std::time::{Duration, Instant};

use shmframe_core::frame::payload_mut;
use shmframe_core::shm::{Segment, SharedMemoryRegion};
use shmframe_core::{ConfigLoader, FrameSnapshot, Sample, SharedMemoryError};

pub async fn execute(
    config_path: &str,
    frames: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_file(config_path)?;
    let layout = config.layout;

    let region = SharedMemoryRegion::create(&config.segment.name, layout.total_size())?;
    let record = config.header_mode.record_in(&region)?;
    let sample: &Sample = region.get(layout.sample_handle())?;
    sample.set_rate_hz(config.frame.rate_hz)?;

    tracing::info!(
        segment = %config.segment.name,
        size = layout.total_size(),
        mode = %config.header_mode,
        rows = config.frame.rows,
        cols = config.frame.cols,
        type_code = %config.frame.type_code,
        rate_hz = config.frame.rate_hz,
        "Publishing frames"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / config.frame.rate_hz));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let start = Instant::now();
    let mut published: u64 = 0;

    while frames.map_or(true, |limit| published < limit) {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }
        }

        let slot_index = (published % layout.slots() as u64) as usize;
        let slot = layout
            .slot_handle(slot_index)
            .ok_or_else(|| SharedMemoryError::InvalidLayout {
                reason: format!("slot {} missing", slot_index),
            })?;
        let frame = FrameSnapshot::new(
            slot,
            layout.sample_handle(),
            config.frame.rows,
            config.frame.cols,
            config.frame.type_code,
        );

        // SAFETY: this process is the only writer of the segment, and
        // consumers only copy payloads out with volatile loads, never holding
        // a reference into a slot.
        let payload = unsafe { payload_mut(&region, &frame)? };
        fill_pattern(payload, published);

        let count = sample.increment_count_at(start.elapsed());
        record.publish_checked(&frame)?;
        published += 1;

        tracing::debug!(count = count, slot = %slot, "Published frame");
    }

    tracing::info!(frames = published, "Producer stopped; unlinking segment");
    Ok(())
}

/// Diagonal gradient that shifts by one each frame.
fn fill_pattern(payload: &mut [u8], frame_index: u64) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = (i as u64).wrapping_add(frame_index) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_pattern_shifts() {
        let mut first = [0u8; 4];
        let mut second = [0u8; 4];
        fill_pattern(&mut first, 0);
        fill_pattern(&mut second, 1);
        assert_eq!(first, [0, 1, 2, 3]);
        assert_eq!(second, [1, 2, 3, 4]);

        let mut wrapped = [0u8; 2];
        fill_pattern(&mut wrapped, 255);
        assert_eq!(wrapped, [255, 0]);
    }
}
