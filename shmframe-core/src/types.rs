// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for the values stored in a frame header.
//!
//! Both types are opaque to the header: it stores and returns them verbatim.
//! Interpretation happens only at the edges, in the segment mapping (handles)
//! and in frame views (type codes).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Segment-relative reference to an object inside a shared memory segment.
///
/// The value is the byte offset of the object from the segment base, so the
/// same handle is valid in every process that maps the segment, whatever the
/// local base address. A handle is never dereferenced directly; resolve it
/// through [`crate::shm::Segment::resolve`].
///
/// Offset 0 is reserved for the frame header itself, which makes
/// [`Handle::NULL`] both the zero byte pattern and distinguishable from any
/// handle a producer can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The "no object" handle.
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Handle> for u64 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Element depth of a matrix type code.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    U8 = 0,
    S8 = 1,
    U16 = 2,
    S16 = 3,
    S32 = 4,
    F32 = 5,
    F64 = 6,
    F16 = 7,
}

impl Depth {
    /// Size of a single channel value in bytes.
    pub const fn size(self) -> usize {
        match self {
            Depth::U8 | Depth::S8 => 1,
            Depth::U16 | Depth::S16 | Depth::F16 => 2,
            Depth::S32 | Depth::F32 => 4,
            Depth::F64 => 8,
        }
    }

    const fn from_bits(bits: i32) -> Self {
        match bits & DEPTH_MASK {
            0 => Depth::U8,
            1 => Depth::S8,
            2 => Depth::U16,
            3 => Depth::S16,
            4 => Depth::S32,
            5 => Depth::F32,
            6 => Depth::F64,
            _ => Depth::F16,
        }
    }
}

const DEPTH_MASK: i32 = 0b111;
const CHANNEL_SHIFT: i32 = 3;
/// Largest channel count the type-code convention can express.
pub const MAX_CHANNELS: u16 = 512;

/// Element type code: depth in the low 3 bits, `channels - 1` above them.
///
/// This follows the numeric type tags of common matrix libraries (for
/// example 16 is three 8-bit unsigned channels). The header treats the value
/// as opaque; decoding is only needed to size a payload view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct TypeCode(i32);

impl TypeCode {
    pub const U8C1: TypeCode = TypeCode(0);
    pub const U8C3: TypeCode = TypeCode(16);
    pub const U8C4: TypeCode = TypeCode(24);
    pub const F32C1: TypeCode = TypeCode(5);

    /// Build a type code from depth and channel count.
    pub fn new(depth: Depth, channels: u16) -> Result<Self, HardValidationError> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(HardValidationError::InvalidFieldValue {
                field: "channels",
                value: channels.to_string(),
                reason: format!("Channel count must be between 1 and {}", MAX_CHANNELS),
            });
        }
        Ok(Self(depth as i32 | (i32::from(channels - 1) << CHANNEL_SHIFT)))
    }

    /// Wrap a raw code without interpreting it.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Split the code into depth and channel count.
    ///
    /// Returns `None` for codes outside the convention (negative, or with
    /// bits above the channel field).
    pub fn decode(self) -> Option<(Depth, u16)> {
        let max_code = (i32::from(MAX_CHANNELS) << CHANNEL_SHIFT) - 1;
        if !(0..=max_code).contains(&self.0) {
            return None;
        }
        let channels = (self.0 >> CHANNEL_SHIFT) as u16 + 1;
        Some((Depth::from_bits(self.0), channels))
    }

    pub fn depth(self) -> Option<Depth> {
        self.decode().map(|(depth, _)| depth)
    }

    pub fn channels(self) -> Option<u16> {
        self.decode().map(|(_, channels)| channels)
    }

    /// Bytes per element (all channels of one pixel).
    pub fn element_size(self) -> Option<usize> {
        self.decode()
            .map(|(depth, channels)| depth.size() * usize::from(channels))
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TypeCode {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<TypeCode> for i32 {
    fn from(code: TypeCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        assert!(Handle::NULL.is_null());
        assert_eq!(Handle::default(), Handle::NULL);
        assert!(!Handle::from_raw(64).is_null());
        assert_eq!(Handle::from_raw(64).to_string(), "0x40");
    }

    #[test]
    fn test_type_code_construction() {
        assert_eq!(TypeCode::new(Depth::U8, 3).unwrap(), TypeCode::U8C3);
        assert_eq!(TypeCode::new(Depth::U8, 1).unwrap(), TypeCode::U8C1);
        assert_eq!(TypeCode::new(Depth::F32, 1).unwrap(), TypeCode::F32C1);
        assert_eq!(TypeCode::new(Depth::F64, 2).unwrap().raw(), 14);
        assert!(TypeCode::new(Depth::U8, 0).is_err());
        assert!(TypeCode::new(Depth::U8, MAX_CHANNELS + 1).is_err());
    }

    #[test]
    fn test_type_code_decode() {
        assert_eq!(TypeCode::U8C3.decode(), Some((Depth::U8, 3)));
        assert_eq!(TypeCode::U8C3.element_size(), Some(3));
        assert_eq!(TypeCode::from_raw(13).decode(), Some((Depth::F32, 2)));
        assert_eq!(TypeCode::from_raw(13).element_size(), Some(8));
        assert_eq!(TypeCode::from_raw(7).element_size(), Some(2));
    }

    #[test]
    fn test_type_code_out_of_convention() {
        assert_eq!(TypeCode::from_raw(-1).decode(), None);
        assert_eq!(TypeCode::from_raw(4096).decode(), None);
        assert_eq!(TypeCode::from_raw(4095).channels(), Some(512));
    }
}
