// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame header with one atomic cell per field.
//!
//! Each field is individually atomic, so a reader never sees half of a
//! handle. The five fields are not updated as a unit: a reader racing
//! [`FrameHeader::set_parameters`] may observe new rows next to an old data
//! handle. Producers and consumers either share an external lock around
//! every access, or accept torn reads. Use [`super::SeqFrameHeader`] when
//! readers must see whole frames without a lock.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use super::{FrameRecord, FrameSnapshot};
use crate::shm::SharedPlacement;
use crate::types::{Handle, TypeCode};

/// Zero-copy frame descriptor living inside a shared memory segment.
///
/// Holds the payload geometry, its type code, and two segment-relative
/// handles: one to the payload and one to the [`crate::Sample`] record. It
/// owns neither; the segment owner frees both. The all-zero byte pattern is
/// the default state, so a freshly created (zero-filled) segment already
/// contains an unpublished header.
#[repr(C)]
#[derive(Debug, Default)]
pub struct FrameHeader {
    data: AtomicU64,
    sample: AtomicU64,
    rows: AtomicU64,
    cols: AtomicU64,
    type_code: AtomicI32,
}

const _: () = assert!(std::mem::size_of::<FrameHeader>() == 40);

// SAFETY: repr(C), atomics only, valid when zeroed.
unsafe impl SharedPlacement for FrameHeader {}

impl FrameHeader {
    /// Create an unpublished header: zero geometry, zero type, null handles.
    pub const fn new() -> Self {
        Self {
            data: AtomicU64::new(Handle::NULL.raw()),
            sample: AtomicU64::new(Handle::NULL.raw()),
            rows: AtomicU64::new(0),
            cols: AtomicU64::new(0),
            type_code: AtomicI32::new(0),
        }
    }

    /// Replace all five fields.
    ///
    /// Every value is accepted, including zero dimensions and null handles.
    /// The caller must hold the external write lock for the whole call; the
    /// five stores are independent and a concurrent reader may see any mix
    /// of old and new values.
    pub fn set_parameters(
        &self,
        data: Handle,
        sample: Handle,
        rows: u64,
        cols: u64,
        type_code: TypeCode,
    ) {
        self.data.store(data.raw(), Ordering::Release);
        self.sample.store(sample.raw(), Ordering::Release);
        self.rows.store(rows, Ordering::Release);
        self.cols.store(cols, Ordering::Release);
        self.type_code.store(type_code.raw(), Ordering::Release);
    }

    pub fn rows(&self) -> u64 {
        self.rows.load(Ordering::Acquire)
    }

    pub fn cols(&self) -> u64 {
        self.cols.load(Ordering::Acquire)
    }

    pub fn type_code(&self) -> TypeCode {
        TypeCode::from_raw(self.type_code.load(Ordering::Acquire))
    }

    /// Handle of the payload buffer.
    pub fn data(&self) -> Handle {
        Handle::from_raw(self.data.load(Ordering::Acquire))
    }

    /// Handle of the sample clock record.
    pub fn sample(&self) -> Handle {
        Handle::from_raw(self.sample.load(Ordering::Acquire))
    }

    /// Read all five fields, one load each.
    ///
    /// Carries the same guarantees as calling the accessors one after the
    /// other: consistent only under the external lock.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            data: self.data(),
            sample: self.sample(),
            rows: self.rows(),
            cols: self.cols(),
            type_code: self.type_code(),
        }
    }
}

impl FrameRecord for FrameHeader {
    fn publish(&self, frame: &FrameSnapshot) {
        self.set_parameters(
            frame.data,
            frame.sample,
            frame.rows,
            frame.cols,
            frame.type_code,
        );
    }

    fn load(&self) -> FrameSnapshot {
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let header = FrameHeader::new();
        assert_eq!(header.rows(), 0);
        assert_eq!(header.cols(), 0);
        assert_eq!(header.type_code(), TypeCode::from_raw(0));
        assert_eq!(header.data(), Handle::NULL);
        assert_eq!(header.sample(), Handle::NULL);
        assert!(!header.snapshot().is_published());
    }

    #[test]
    fn test_set_parameters_round_trip() {
        let header = FrameHeader::default();
        header.set_parameters(
            Handle::from_raw(42),
            Handle::from_raw(7),
            480,
            640,
            TypeCode::from_raw(16),
        );

        assert_eq!(header.rows(), 480);
        assert_eq!(header.cols(), 640);
        assert_eq!(header.type_code(), TypeCode::from_raw(16));
        assert_eq!(header.data(), Handle::from_raw(42));
        assert_eq!(header.sample(), Handle::from_raw(7));
    }

    #[test]
    fn test_accessors_in_any_order() {
        let header = FrameHeader::new();
        header.set_parameters(
            Handle::from_raw(4096),
            Handle::from_raw(64),
            2,
            3,
            TypeCode::U8C4,
        );

        assert_eq!(header.sample(), Handle::from_raw(64));
        assert_eq!(header.cols(), 3);
        assert_eq!(header.data(), Handle::from_raw(4096));
        assert_eq!(header.type_code(), TypeCode::U8C4);
        assert_eq!(header.rows(), 2);
        assert_eq!(header.cols(), 3);
    }

    #[test]
    fn test_accepts_degenerate_values() {
        let header = FrameHeader::new();
        header.set_parameters(
            Handle::NULL,
            Handle::NULL,
            0,
            0,
            TypeCode::from_raw(-1),
        );
        assert_eq!(header.snapshot().rows, 0);
        assert_eq!(header.type_code().raw(), -1);
    }

    #[test]
    fn test_repeated_publish_keeps_last() {
        let header = FrameHeader::new();
        for i in 1..=10u64 {
            header.set_parameters(
                Handle::from_raw(i * 64),
                Handle::from_raw(i),
                i,
                i * 2,
                TypeCode::from_raw(i as i32),
            );
        }
        assert_eq!(
            header.snapshot(),
            FrameSnapshot::new(
                Handle::from_raw(640),
                Handle::from_raw(10),
                10,
                20,
                TypeCode::from_raw(10),
            )
        );
    }
}
