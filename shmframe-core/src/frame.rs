// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Zero-copy frame views.
//!
//! A consumer reads a [`FrameSnapshot`] from the header and resolves its two
//! handles against its own mapping of the segment. The resulting
//! [`FrameView`] borrows the payload bytes and the sample record in place.

use std::fmt;
use std::sync::atomic::{fence, Ordering};

use serde::Serialize;

use crate::error::FrameError;
use crate::header::{FrameRecord, FrameSnapshot};
use crate::sample::{Sample, SampleValues};
use crate::shm::Segment;
use crate::types::TypeCode;

/// Payload size in bytes of a `rows` x `cols` frame of `type_code` elements.
pub fn payload_len(rows: u64, cols: u64, type_code: TypeCode) -> Result<usize, FrameError> {
    let element_size = type_code
        .element_size()
        .ok_or(FrameError::UnknownTypeCode(type_code))?;

    rows.checked_mul(cols)
        .and_then(|elements| usize::try_from(elements).ok())
        .and_then(|elements| elements.checked_mul(element_size))
        .ok_or(FrameError::PayloadTooLarge {
            rows,
            cols,
            type_code,
        })
}

/// Borrowed view of a published frame.
pub struct FrameView<'a> {
    frame: FrameSnapshot,
    data: &'a [u8],
    sample: &'a Sample,
}

impl<'a> FrameView<'a> {
    /// Resolve a snapshot into a view over `segment`.
    ///
    /// # Safety
    /// The caller must hold the external read lock (or otherwise know the
    /// producer will not touch this payload) for as long as the view lives.
    /// The snapshot must come from the header of this same segment.
    pub unsafe fn resolve<S: Segment>(
        segment: &'a S,
        frame: &FrameSnapshot,
    ) -> Result<Self, FrameError> {
        if !frame.is_published() {
            return Err(FrameError::NotPublished);
        }
        let len = payload_len(frame.rows, frame.cols, frame.type_code)?;
        let data = segment.slice(frame.data, len)?;
        let sample = segment.get::<Sample>(frame.sample)?;

        Ok(Self {
            frame: *frame,
            data,
            sample,
        })
    }

    pub fn rows(&self) -> u64 {
        self.frame.rows
    }

    pub fn cols(&self) -> u64 {
        self.frame.cols
    }

    pub fn type_code(&self) -> TypeCode {
        self.frame.type_code
    }

    /// Header fields this view was built from.
    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.frame
    }

    /// The whole payload.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn sample(&self) -> &'a Sample {
        self.sample
    }

    /// Bytes per row.
    pub fn row_len(&self) -> usize {
        match usize::try_from(self.frame.rows) {
            Ok(rows) if rows > 0 => self.data.len() / rows,
            _ => 0,
        }
    }

    /// Bytes of row `index`, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&'a [u8]> {
        let row_len = self.row_len();
        let start = index.checked_mul(row_len)?;
        if index as u64 >= self.frame.rows {
            return None;
        }
        self.data.get(start..start.checked_add(row_len)?)
    }

    /// CRC32 of the payload.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(self.data)
    }

    /// Deep copy of payload and sample values.
    pub fn to_owned_frame(&self) -> OwnedFrame {
        OwnedFrame {
            header: self.frame,
            data: self.data.to_vec(),
            sample: self.sample.values(),
        }
    }
}

impl fmt::Debug for FrameView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameView")
            .field("frame", &self.frame)
            .field("data_len", &self.data.len())
            .field("sample", &self.sample.values())
            .finish()
    }
}

/// A frame copied out of shared memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedFrame {
    /// Header fields the copy was taken from.
    pub header: FrameSnapshot,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub sample: SampleValues,
}

impl OwnedFrame {
    /// CRC32 of the copied payload.
    pub fn checksum(&self) -> u32 {
        crc32fast::hash(&self.data)
    }
}

/// Attempts made by [`copy_published`] before giving up.
pub const COPY_ATTEMPTS: usize = 16;

/// Copy the frame currently published in `record` out of `segment`, without
/// holding the producer off.
///
/// Payload bytes are read with volatile loads into an owned buffer. The copy
/// is kept only if the header and the sample count are unchanged afterwards,
/// otherwise it is retried, up to [`COPY_ATTEMPTS`] times. Returns `Ok(None)`
/// when nothing has been published.
///
/// A stable header proves the copy whole only when the producer never
/// rewrites the published slot, which holds for two or more rotating payload
/// slots. With a single slot the producer fills the published payload in
/// place and the copy may still mix two frames.
pub fn copy_published<S: Segment>(
    segment: &S,
    record: &dyn FrameRecord,
) -> Result<Option<OwnedFrame>, FrameError> {
    for _ in 0..COPY_ATTEMPTS {
        let frame = record.load();
        if !frame.is_published() {
            return Ok(None);
        }

        let copied = copy_once(segment, &frame);
        fence(Ordering::Acquire);
        let unchanged = record.load() == frame;

        match copied {
            Ok(owned) if unchanged => {
                let sample = segment.get::<Sample>(frame.sample)?;
                if sample.count() == owned.sample.count {
                    return Ok(Some(owned));
                }
            }
            // A header that stayed put was read whole, so its error stands.
            Err(e) if unchanged => return Err(e),
            _ => {}
        }
        std::hint::spin_loop();
    }

    Err(FrameError::Overtaken {
        attempts: COPY_ATTEMPTS,
    })
}

fn copy_once<S: Segment>(segment: &S, frame: &FrameSnapshot) -> Result<OwnedFrame, FrameError> {
    let len = payload_len(frame.rows, frame.cols, frame.type_code)?;
    let sample = segment.get::<Sample>(frame.sample)?.values();
    let src = segment.resolve(frame.data, len)?.as_ptr();

    // SAFETY: resolve checked that `len` bytes at `src` lie inside the
    // mapping. Volatile byte loads never form a reference to memory the
    // producer may be writing; a torn result is rejected by the caller.
    let data = (0..len)
        .map(|i| unsafe { std::ptr::read_volatile(src.add(i)) })
        .collect();

    Ok(OwnedFrame {
        header: *frame,
        data,
        sample,
    })
}

/// Producer side: writable payload named by `frame`, to fill before
/// publishing the snapshot.
///
/// # Safety
/// The caller must hold the external write lock, and no consumer may hold a
/// view over this payload while the slice is alive.
#[allow(clippy::mut_from_ref)]
pub unsafe fn payload_mut<'a, S: Segment>(
    segment: &'a S,
    frame: &FrameSnapshot,
) -> Result<&'a mut [u8], FrameError> {
    let len = payload_len(frame.rows, frame.cols, frame.type_code)?;
    Ok(segment.slice_mut(frame.data, len)?)
}
