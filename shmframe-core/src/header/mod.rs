// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame exchange headers.
//!
//! A header is the fixed-layout record a producer writes into shared memory
//! so that a consumer process can rebuild a view over the payload without
//! copying it. Two layouts are provided:
//!
//! - [`FrameHeader`]: five independently atomic fields. Torn reads are
//!   possible without an external lock.
//! - [`SeqFrameHeader`]: the same fields behind a sequence counter. Readers
//!   always see one complete publish.
//!
//! Neither header allocates or logs. Validation is opt-in through
//! [`FrameRecord::publish_checked`].

mod fields;
mod seq;
mod snapshot;

use serde::{Deserialize, Serialize};

use crate::error::{HeaderError, SharedMemoryError};
use crate::shm::Segment;

pub use fields::FrameHeader;
pub use seq::SeqFrameHeader;
pub use snapshot::FrameSnapshot;

/// Common publish/load surface of both header layouts.
pub trait FrameRecord: Sync {
    /// Write all five fields. Never fails.
    fn publish(&self, frame: &FrameSnapshot);

    /// Read all five fields.
    fn load(&self) -> FrameSnapshot;

    /// Strict mode: reject null handles and zero dimensions before
    /// publishing.
    ///
    /// This is stricter than [`FrameRecord::publish`], which accepts every
    /// value. On rejection the header is left untouched.
    fn publish_checked(&self, frame: &FrameSnapshot) -> Result<(), HeaderError> {
        frame.validate()?;
        self.publish(frame);
        Ok(())
    }
}

impl FrameHeader {
    /// [`FrameHeader::set_parameters`] in strict mode.
    pub fn set_parameters_checked(&self, frame: &FrameSnapshot) -> Result<(), HeaderError> {
        self.publish_checked(frame)
    }
}

impl SeqFrameHeader {
    /// [`SeqFrameHeader::publish`] in strict mode.
    pub fn publish_checked(&self, frame: &FrameSnapshot) -> Result<(), HeaderError> {
        FrameRecord::publish_checked(self, frame)
    }
}

/// Which header layout a segment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// [`FrameHeader`], per-field atomicity.
    Fields,
    /// [`SeqFrameHeader`], whole-frame snapshots.
    #[default]
    Seqlock,
}

impl HeaderMode {
    /// Bytes the header occupies at the start of a segment.
    pub const fn header_size(self) -> usize {
        match self {
            HeaderMode::Fields => std::mem::size_of::<FrameHeader>(),
            HeaderMode::Seqlock => std::mem::size_of::<SeqFrameHeader>(),
        }
    }

    /// The header at offset 0 of `segment`, interpreted in this layout.
    ///
    /// The segment does not record which layout its producer used. Producer
    /// and consumer must be configured with the same mode; with different
    /// modes the consumer reads the wrong fields without any error.
    pub fn record_in<S: Segment>(self, segment: &S) -> Result<&dyn FrameRecord, SharedMemoryError> {
        let record: &dyn FrameRecord = match self {
            HeaderMode::Fields => segment.header::<FrameHeader>()?,
            HeaderMode::Seqlock => segment.header::<SeqFrameHeader>()?,
        };
        Ok(record)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HeaderMode::Fields => "fields",
            HeaderMode::Seqlock => "seqlock",
        }
    }
}

impl std::fmt::Display for HeaderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Handle, TypeCode};

    fn publish_and_load<R: FrameRecord + Default>() -> FrameSnapshot {
        let record = R::default();
        record.publish(&FrameSnapshot::new(
            Handle::from_raw(256),
            Handle::from_raw(64),
            4,
            8,
            TypeCode::F32C1,
        ));
        record.load()
    }

    #[test]
    fn test_both_layouts_round_trip() {
        assert_eq!(
            publish_and_load::<FrameHeader>(),
            publish_and_load::<SeqFrameHeader>()
        );
    }

    #[test]
    fn test_checked_publish_leaves_header_untouched() {
        let header = FrameHeader::new();
        let rejected = FrameSnapshot::new(Handle::NULL, Handle::from_raw(8), 1, 1, TypeCode::U8C1);
        assert_eq!(
            header.set_parameters_checked(&rejected),
            Err(HeaderError::NullDataHandle)
        );
        assert_eq!(header.snapshot(), FrameSnapshot::EMPTY);

        let seq = SeqFrameHeader::new();
        let flat =
            FrameSnapshot::new(Handle::from_raw(64), Handle::from_raw(8), 0, 1, TypeCode::U8C1);
        assert!(seq.publish_checked(&flat).is_err());
        assert_eq!(seq.read(), FrameSnapshot::EMPTY);
    }

    #[test]
    fn test_record_in_segment() {
        let segment = crate::shm::HeapSegment::new(256).unwrap();
        let frame =
            FrameSnapshot::new(Handle::from_raw(128), Handle::from_raw(64), 1, 2, TypeCode::U8C1);

        HeaderMode::Seqlock.record_in(&segment).unwrap().publish(&frame);
        let header: &SeqFrameHeader = segment.header().unwrap();
        assert_eq!(header.read(), frame);
    }

    #[test]
    fn test_mismatched_mode_is_not_detected() {
        let segment = crate::shm::HeapSegment::new(256).unwrap();
        let frame =
            FrameSnapshot::new(Handle::from_raw(128), Handle::from_raw(64), 1, 2, TypeCode::U8C1);
        HeaderMode::Seqlock.record_in(&segment).unwrap().publish(&frame);

        let misread = HeaderMode::Fields.record_in(&segment).unwrap().load();
        assert_ne!(misread, frame);
        assert_eq!(misread.data, Handle::from_raw(2));
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(HeaderMode::Fields.header_size(), 40);
        assert_eq!(HeaderMode::Seqlock.header_size(), 48);
        assert_eq!(HeaderMode::default(), HeaderMode::Seqlock);
    }
}
