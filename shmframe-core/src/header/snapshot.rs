// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Plain value copy of the five header fields.

use serde::Serialize;

use crate::error::HeaderError;
use crate::types::{Handle, TypeCode};

/// The five header fields as an ordinary value.
///
/// Whether a snapshot is consistent depends on where it came from:
/// [`super::SeqFrameHeader::read`] always yields a tuple that was published
/// as a whole, while [`super::FrameHeader::snapshot`] may mix fields of two
/// publishes when it races a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct FrameSnapshot {
    /// Handle of the payload buffer.
    pub data: Handle,
    /// Handle of the sample clock record.
    pub sample: Handle,
    pub rows: u64,
    pub cols: u64,
    pub type_code: TypeCode,
}

impl FrameSnapshot {
    /// The never-published state.
    pub const EMPTY: FrameSnapshot = FrameSnapshot {
        data: Handle::NULL,
        sample: Handle::NULL,
        rows: 0,
        cols: 0,
        type_code: TypeCode::from_raw(0),
    };

    pub const fn new(
        data: Handle,
        sample: Handle,
        rows: u64,
        cols: u64,
        type_code: TypeCode,
    ) -> Self {
        Self {
            data,
            sample,
            rows,
            cols,
            type_code,
        }
    }

    /// True once a producer has published a payload handle.
    ///
    /// This reads the null-handle convention; the header itself does not
    /// record whether it was ever written.
    pub const fn is_published(&self) -> bool {
        !self.data.is_null()
    }

    /// Strict-mode check used by the `*_checked` publish operations.
    ///
    /// Rejects null handles and zero dimensions. The plain publish path never
    /// calls this.
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.data.is_null() {
            return Err(HeaderError::NullDataHandle);
        }
        if self.sample.is_null() {
            return Err(HeaderError::NullSampleHandle);
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(HeaderError::ZeroDimension {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(FrameSnapshot::default(), FrameSnapshot::EMPTY);
        assert!(!FrameSnapshot::EMPTY.is_published());
    }

    #[test]
    fn test_validate() {
        let good = FrameSnapshot::new(
            Handle::from_raw(128),
            Handle::from_raw(64),
            480,
            640,
            TypeCode::U8C3,
        );
        assert!(good.is_published());
        assert_eq!(good.validate(), Ok(()));

        let no_data = FrameSnapshot {
            data: Handle::NULL,
            ..good
        };
        assert_eq!(no_data.validate(), Err(HeaderError::NullDataHandle));

        let no_sample = FrameSnapshot {
            sample: Handle::NULL,
            ..good
        };
        assert_eq!(no_sample.validate(), Err(HeaderError::NullSampleHandle));

        let flat = FrameSnapshot { rows: 0, ..good };
        assert_eq!(
            flat.validate(),
            Err(HeaderError::ZeroDimension { rows: 0, cols: 640 })
        );
    }
}
