// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Fixtures shared by the shmframe benchmarks.

use shmframe_core::shm::{ExchangeLayout, HeapSegment, Segment};
use shmframe_core::{FrameSnapshot, Handle, HeaderMode, Sample, TypeCode};

/// Frame `i` with every field derived from `i`.
pub fn stamped(i: u64) -> FrameSnapshot {
    FrameSnapshot::new(
        Handle::from_raw(64 * (i + 1)),
        Handle::from_raw(i + 1),
        i,
        i + 1,
        TypeCode::from_raw((i % 4096) as i32),
    )
}

/// An in-process segment holding one published `rows` x `cols` frame.
pub fn published_exchange(
    mode: HeaderMode,
    rows: u64,
    cols: u64,
    type_code: TypeCode,
) -> (HeapSegment, FrameSnapshot) {
    let layout = ExchangeLayout::for_frame(mode, rows, cols, type_code, 1)
        .expect("benchmark frame must fit a segment");
    let segment = HeapSegment::new(layout.total_size()).expect("Failed to allocate segment");
    let slot = layout.slot_handle(0).expect("layout has one slot");
    let frame = FrameSnapshot::new(slot, layout.sample_handle(), rows, cols, type_code);

    segment
        .get::<Sample>(layout.sample_handle())
        .expect("sample block is aligned")
        .increment_count();
    mode.record_in(&segment)
        .expect("segment holds a header")
        .publish(&frame);

    (segment, frame)
}
