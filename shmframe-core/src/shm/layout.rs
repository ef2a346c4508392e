// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Fixed placement of one frame exchange inside a segment.
//!
//! ```text
//! offset 0    header (FrameHeader or SeqFrameHeader)
//! offset 64   Sample
//! offset 128  payload slot 0
//!             payload slot 1
//!             ...
//! ```
//!
//! Every block starts on a 64-byte boundary. The layout is computed once
//! from the frame geometry; nothing is allocated or resized afterwards.

use crate::error::{FrameError, SharedMemoryError};
use crate::frame::payload_len;
use crate::header::HeaderMode;
use crate::sample::Sample;
use crate::shm::SharedMemoryRegion;
use crate::types::{Handle, TypeCode};

/// Alignment of every block in the layout.
pub const BLOCK_ALIGN: usize = 64;

const PAGE_SIZE: usize = 4096;

/// Offsets of the header, sample record and payload slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeLayout {
    mode: HeaderMode,
    payload_len: usize,
    slots: usize,
    sample_offset: usize,
    first_slot_offset: usize,
    slot_stride: usize,
    total_size: usize,
}

impl ExchangeLayout {
    /// Upper bound on payload slots.
    pub const MAX_SLOTS: usize = 8;

    /// Layout for `slots` payload buffers of `payload_len` bytes each.
    pub fn new(
        mode: HeaderMode,
        payload_len: usize,
        slots: usize,
    ) -> Result<Self, SharedMemoryError> {
        if payload_len == 0 {
            return Err(invalid("payload length must be non-zero".to_string()));
        }
        if slots == 0 || slots > Self::MAX_SLOTS {
            return Err(invalid(format!(
                "slot count {} outside 1..={}",
                slots,
                Self::MAX_SLOTS
            )));
        }

        let overflow = || invalid(format!("{} slots of {} bytes overflow", slots, payload_len));

        let sample_offset = align_up(mode.header_size(), BLOCK_ALIGN).ok_or_else(overflow)?;
        let first_slot_offset = sample_offset
            .checked_add(std::mem::size_of::<Sample>())
            .and_then(|end| align_up(end, BLOCK_ALIGN))
            .ok_or_else(overflow)?;
        let slot_stride = align_up(payload_len, BLOCK_ALIGN).ok_or_else(overflow)?;
        let used = slot_stride
            .checked_mul(slots)
            .and_then(|slots_len| slots_len.checked_add(first_slot_offset))
            .ok_or_else(overflow)?;
        let total_size = align_up(used, PAGE_SIZE)
            .ok_or_else(overflow)?
            .max(SharedMemoryRegion::MIN_SIZE);

        if total_size > SharedMemoryRegion::MAX_SIZE {
            return Err(invalid(format!(
                "{} bytes exceeds the {} byte region limit",
                total_size,
                SharedMemoryRegion::MAX_SIZE
            )));
        }

        Ok(Self {
            mode,
            payload_len,
            slots,
            sample_offset,
            first_slot_offset,
            slot_stride,
            total_size,
        })
    }

    /// Layout sized for a `rows` x `cols` frame of `type_code` elements.
    pub fn for_frame(
        mode: HeaderMode,
        rows: u64,
        cols: u64,
        type_code: TypeCode,
        slots: usize,
    ) -> Result<Self, FrameError> {
        let len = payload_len(rows, cols, type_code)?;
        Ok(Self::new(mode, len, slots)?)
    }

    pub fn mode(&self) -> HeaderMode {
        self.mode
    }

    /// Bytes in one payload slot (unpadded).
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Segment size to create, page rounded.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn sample_handle(&self) -> Handle {
        Handle::from_raw(self.sample_offset as u64)
    }

    /// Handle of payload slot `index`, or `None` past the last slot.
    pub fn slot_handle(&self, index: usize) -> Option<Handle> {
        (index < self.slots)
            .then(|| Handle::from_raw((self.first_slot_offset + index * self.slot_stride) as u64))
    }
}

fn invalid(reason: String) -> SharedMemoryError {
    SharedMemoryError::InvalidLayout { reason }
}

fn align_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? & !(align - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(8, 8), Some(8));
        assert_eq!(align_up(9, 8), Some(16));
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(usize::MAX, 8), None);
    }

    #[test]
    fn test_offsets() {
        let layout = ExchangeLayout::new(HeaderMode::Seqlock, 100, 2).unwrap();
        assert_eq!(layout.sample_handle(), Handle::from_raw(64));
        assert_eq!(layout.slot_handle(0), Some(Handle::from_raw(128)));
        assert_eq!(layout.slot_handle(1), Some(Handle::from_raw(256)));
        assert_eq!(layout.slot_handle(2), None);
        assert_eq!(layout.total_size(), SharedMemoryRegion::MIN_SIZE);
    }

    #[test]
    fn test_for_frame_vga_rgb() {
        let layout =
            ExchangeLayout::for_frame(HeaderMode::Fields, 480, 640, TypeCode::U8C3, 2).unwrap();
        assert_eq!(layout.payload_len(), 480 * 640 * 3);
        assert_eq!(layout.total_size() % PAGE_SIZE, 0);
        assert!(layout.total_size() >= 128 + 2 * 480 * 640 * 3);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(ExchangeLayout::new(HeaderMode::Fields, 0, 1).is_err());
        assert!(ExchangeLayout::new(HeaderMode::Fields, 64, 0).is_err());
        let too_many = ExchangeLayout::MAX_SLOTS + 1;
        assert!(ExchangeLayout::new(HeaderMode::Fields, 64, too_many).is_err());
        assert!(ExchangeLayout::new(HeaderMode::Fields, SharedMemoryRegion::MAX_SIZE, 2).is_err());
        let unknown = TypeCode::from_raw(-3);
        assert!(ExchangeLayout::for_frame(HeaderMode::Fields, 4, 4, unknown, 1).is_err());
    }
}
