// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for shmframe.
//!
//! Explicit enum error types only. No `Box<dyn Error>`, no `anyhow::Result`.
//! The frame header itself never fails; these errors belong to the
//! collaborators around it (segment mapping, frame views, sample clock,
//! configuration) and to the opt-in strict publish mode.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Handle, TypeCode};

/// Top-level error type for shmframe.
#[derive(Debug, Error)]
pub enum ShmFrameError {
    // =========================================================================
    // Configuration Errors - Fail-Fast on Invalid Config
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // Shared Memory Errors
    // =========================================================================
    #[error("Shared memory error: {0}")]
    SharedMemory(#[from] SharedMemoryError),

    // =========================================================================
    // Frame Exchange Errors
    // =========================================================================
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Header rejected: {0}")]
    Header(#[from] HeaderError),

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),

    // =========================================================================
    // System Errors
    // =========================================================================
    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Hard validation errors for configuration that cannot be used safely.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Missing required field: {field} in {context}")]
    MissingRequiredField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Shared memory mapping and handle resolution errors.
#[derive(Debug, Error)]
pub enum SharedMemoryError {
    #[error("Failed to create shared memory region: {name} - {reason}")]
    CreateFailed { name: String, reason: String },

    #[error("Failed to map shared memory: {reason}")]
    MapFailed { reason: String },

    #[error("Null handle cannot be resolved")]
    NullHandle,

    #[error("Handle {handle} with length {len} exceeds segment of {segment_len} bytes")]
    HandleOutOfBounds {
        handle: Handle,
        len: usize,
        segment_len: usize,
    },

    #[error("Handle {handle} is not aligned to {align} bytes")]
    MisalignedHandle { handle: Handle, align: usize },

    #[error("Invalid segment layout: {reason}")]
    InvalidLayout { reason: String },
}

/// Errors building a view over a published frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Unknown element type code: {0}")]
    UnknownTypeCode(TypeCode),

    #[error("Frame of {rows}x{cols} with type {type_code} overflows addressable size")]
    PayloadTooLarge {
        rows: u64,
        cols: u64,
        type_code: TypeCode,
    },

    #[error("No frame has been published")]
    NotPublished,

    #[error("Producer overtook {attempts} copy attempts")]
    Overtaken { attempts: usize },

    #[error(transparent)]
    Segment(#[from] SharedMemoryError),
}

/// Rejections raised by the strict publish mode.
///
/// The plain publish operations accept every value unconditionally; only the
/// `*_checked` variants produce these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("data handle is null")]
    NullDataHandle,

    #[error("sample handle is null")]
    NullSampleHandle,

    #[error("zero dimension: {rows}x{cols}")]
    ZeroDimension { rows: u64, cols: u64 },
}

/// Sample clock errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("Sample period must be positive")]
    NonPositivePeriod,

    #[error("Invalid sample rate: {rate_hz} Hz")]
    InvalidRate { rate_hz: f64 },

    #[error("No sample periods supplied")]
    NoPeriods,
}

/// Result type alias using ShmFrameError.
pub type ShmFrameResult<T> = Result<T, ShmFrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_validation_error_display() {
        let err = HardValidationError::MissingRequiredField {
            field: "rows",
            context: "frame section".to_string(),
        };
        assert!(err.to_string().contains("rows"));
        assert!(err.to_string().contains("frame section"));
    }

    #[test]
    fn test_error_chain() {
        let shm_err = SharedMemoryError::NullHandle;
        let frame_err: FrameError = shm_err.into();
        let top: ShmFrameError = frame_err.into();
        assert!(matches!(
            top,
            ShmFrameError::Frame(FrameError::Segment(SharedMemoryError::NullHandle))
        ));
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = SharedMemoryError::HandleOutOfBounds {
            handle: Handle::from_raw(0x100),
            len: 64,
            segment_len: 128,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x100"));
        assert!(msg.contains("128"));
    }
}
