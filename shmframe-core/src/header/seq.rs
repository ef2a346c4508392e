// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Version-stamped frame header (seqlock).
//!
//! # Synchronization Strategy
//!
//! **Writer**:
//! 1. Bump the sequence to an odd value (write in progress)
//! 2. Release fence
//! 3. Store the five fields
//! 4. Bump the sequence to the next even value with release ordering
//!
//! **Reader**:
//! 1. Load the sequence with acquire ordering; retry while odd
//! 2. Load the five fields
//! 3. Acquire fence
//! 4. Load the sequence again; retry if it changed
//!
//! A reader therefore only returns tuples that were published together,
//! without any lock. Writers are not serialized by this type: two concurrent
//! publishers still need external exclusion, as does the payload buffer the
//! handles point at.

use std::sync::atomic::{fence, AtomicI32, AtomicU64, Ordering};

use super::{FrameRecord, FrameSnapshot};
use crate::shm::SharedPlacement;
use crate::types::{Handle, TypeCode};

/// Frame header whose readers always observe a complete publish.
///
/// Same fields and zero-valued default as [`super::FrameHeader`], plus a
/// sequence word. A writer that dies between steps 1 and 4 leaves the
/// sequence odd; [`SeqFrameHeader::read`] then spins until the segment is
/// reinitialized, and [`SeqFrameHeader::try_read`] keeps returning `None`.
#[repr(C)]
#[derive(Debug, Default)]
pub struct SeqFrameHeader {
    seq: AtomicU64,
    data: AtomicU64,
    sample: AtomicU64,
    rows: AtomicU64,
    cols: AtomicU64,
    type_code: AtomicI32,
}

const _: () = assert!(std::mem::size_of::<SeqFrameHeader>() == 48);

// SAFETY: repr(C), atomics only, valid when zeroed.
unsafe impl SharedPlacement for SeqFrameHeader {}

impl SeqFrameHeader {
    pub const fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            data: AtomicU64::new(Handle::NULL.raw()),
            sample: AtomicU64::new(Handle::NULL.raw()),
            rows: AtomicU64::new(0),
            cols: AtomicU64::new(0),
            type_code: AtomicI32::new(0),
        }
    }

    /// Publish all five fields as one unit.
    ///
    /// Accepts every value. Callers must not publish concurrently with each
    /// other.
    pub fn publish(&self, frame: &FrameSnapshot) {
        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        self.data.store(frame.data.raw(), Ordering::Relaxed);
        self.sample.store(frame.sample.raw(), Ordering::Relaxed);
        self.rows.store(frame.rows, Ordering::Relaxed);
        self.cols.store(frame.cols, Ordering::Relaxed);
        self.type_code.store(frame.type_code.raw(), Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);
    }

    /// Same as [`SeqFrameHeader::publish`] with the argument order of
    /// [`super::FrameHeader::set_parameters`].
    pub fn set_parameters(
        &self,
        data: Handle,
        sample: Handle,
        rows: u64,
        cols: u64,
        type_code: TypeCode,
    ) {
        self.publish(&FrameSnapshot::new(data, sample, rows, cols, type_code));
    }

    /// Read a consistent snapshot, retrying while a write is in flight.
    pub fn read(&self) -> FrameSnapshot {
        loop {
            if let Some(frame) = self.try_read() {
                return frame;
            }
            std::hint::spin_loop();
        }
    }

    /// Single read attempt.
    ///
    /// Returns `None` if a write was in progress or completed during the
    /// read.
    pub fn try_read(&self) -> Option<FrameSnapshot> {
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 == 1 {
            return None;
        }

        let frame = FrameSnapshot {
            data: Handle::from_raw(self.data.load(Ordering::Relaxed)),
            sample: Handle::from_raw(self.sample.load(Ordering::Relaxed)),
            rows: self.rows.load(Ordering::Relaxed),
            cols: self.cols.load(Ordering::Relaxed),
            type_code: TypeCode::from_raw(self.type_code.load(Ordering::Relaxed)),
        };

        fence(Ordering::Acquire);
        let after = self.seq.load(Ordering::Relaxed);
        (before == after).then_some(frame)
    }
}

impl FrameRecord for SeqFrameHeader {
    fn publish(&self, frame: &FrameSnapshot) {
        SeqFrameHeader::publish(self, frame);
    }

    fn load(&self) -> FrameSnapshot {
        self.read()
    }
}
