// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmframe Core Library
//!
//! Zero-copy frame exchange through shared memory. A producer writes a
//! fixed-layout [`FrameHeader`] (or [`SeqFrameHeader`]) holding the frame
//! geometry, its element type code, and two segment-relative handles: one
//! to the payload and one to a [`Sample`] clock record. A consumer process
//! reads the header, resolves the handles against its own mapping, and views
//! the payload in place.
//!
//! The headers are inert data. Segment lifetime, locking between producer
//! and consumer, and the decision of when to publish belong to the caller.

pub mod config;
pub mod error;
pub mod frame;
pub mod header;
pub mod sample;
pub mod shm;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigLoader, ExchangeConfig, FrameConfig, SegmentConfig};
pub use error::{
    FrameError, HardValidationError, HeaderError, SampleError, SharedMemoryError, ShmFrameError,
    ShmFrameResult,
};
pub use frame::{FrameView, OwnedFrame};
pub use header::{FrameHeader, FrameRecord, FrameSnapshot, HeaderMode, SeqFrameHeader};
pub use sample::{Sample, SampleValues};
pub use types::{Depth, Handle, TypeCode};
