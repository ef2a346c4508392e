// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared memory segments.
//!
//! Mapping of POSIX shared memory, handle <-> pointer resolution, and the
//! fixed placement of a frame exchange inside a segment.

mod layout;
mod region;
mod segment;

pub use layout::{ExchangeLayout, BLOCK_ALIGN};
pub use region::SharedMemoryRegion;
pub use segment::{HeapSegment, Segment, SharedPlacement};
