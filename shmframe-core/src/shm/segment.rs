// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Handle resolution against a mapped segment.
//!
//! A [`Handle`] is a byte offset from the segment base. Every process maps
//! the segment at its own address; [`Segment::resolve`] turns a handle back
//! into a pointer valid in the calling process, and [`Segment::handle_of`]
//! does the reverse for the producer.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::SharedMemoryError;
use crate::types::Handle;

/// Types that may be placed directly in shared memory and read through a
/// shared reference.
///
/// # Safety
/// Implementors must be `#[repr(C)]`, contain no pointers, be valid for the
/// all-zero bit pattern and for any bit pattern another process may leave
/// behind, and only mutate through atomics.
pub unsafe trait SharedPlacement: Sync {}

/// A contiguous mapping that handles are relative to.
///
/// # Safety
/// For as long as `&self` is alive, `base()` must point to `len()` bytes
/// that are readable and writable and stay mapped, and `base()` must be
/// aligned to at least 64 bytes. The provided methods build references from
/// these two values without further checks.
///
/// Implementing the trait therefore requires `unsafe`:
///
/// ```compile_fail
/// use std::ptr::NonNull;
/// use shmframe_core::shm::Segment;
///
/// struct Unchecked;
///
/// impl Segment for Unchecked {
///     fn base(&self) -> NonNull<u8> {
///         NonNull::dangling()
///     }
///
///     fn len(&self) -> usize {
///         usize::MAX
///     }
/// }
/// ```
pub unsafe trait Segment {
    /// Local address of offset 0.
    fn base(&self) -> NonNull<u8>;

    /// Mapped length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle of a local address inside this mapping.
    ///
    /// Returns `None` for addresses outside the mapping and for the base
    /// itself, which is reserved for the header.
    fn handle_of(&self, ptr: *const u8) -> Option<Handle> {
        let offset = (ptr as usize).checked_sub(self.base().as_ptr() as usize)?;
        if offset == 0 || offset >= self.len() {
            return None;
        }
        Some(Handle::from_raw(offset as u64))
    }

    /// Local pointer to `len` bytes starting at `handle`.
    ///
    /// Bounds are checked against this mapping only; whether the handle was
    /// issued for this segment, or still names a live object, is up to the
    /// caller.
    fn resolve(&self, handle: Handle, len: usize) -> Result<NonNull<u8>, SharedMemoryError> {
        if handle.is_null() {
            return Err(SharedMemoryError::NullHandle);
        }
        let out_of_bounds = || SharedMemoryError::HandleOutOfBounds {
            handle,
            len,
            segment_len: self.len(),
        };
        let offset = usize::try_from(handle.raw()).map_err(|_| out_of_bounds())?;
        let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
        if end > self.len() {
            return Err(out_of_bounds());
        }
        // SAFETY: offset < end <= len, so the result stays inside the mapping.
        Ok(unsafe { NonNull::new_unchecked(self.base().as_ptr().add(offset)) })
    }

    /// Bytes at `handle`.
    ///
    /// # Safety
    /// No process may write the range while the slice is alive.
    unsafe fn slice(&self, handle: Handle, len: usize) -> Result<&[u8], SharedMemoryError> {
        let ptr = self.resolve(handle, len)?;
        Ok(std::slice::from_raw_parts(ptr.as_ptr(), len))
    }

    /// Writable bytes at `handle`.
    ///
    /// # Safety
    /// The caller must have exclusive access to the range, across every
    /// process mapping the segment, while the slice is alive.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slice_mut(&self, handle: Handle, len: usize) -> Result<&mut [u8], SharedMemoryError> {
        let ptr = self.resolve(handle, len)?;
        Ok(std::slice::from_raw_parts_mut(ptr.as_ptr(), len))
    }

    /// Shared reference to a record placed at `handle`.
    fn get<T: SharedPlacement>(&self, handle: Handle) -> Result<&T, SharedMemoryError> {
        let ptr = self.resolve(handle, std::mem::size_of::<T>())?;
        let align = std::mem::align_of::<T>();
        if ptr.as_ptr() as usize % align != 0 {
            return Err(SharedMemoryError::MisalignedHandle { handle, align });
        }
        // SAFETY: in bounds, aligned, and T is valid for any bit pattern with
        // interior mutability only through atomics.
        Ok(unsafe { &*(ptr.as_ptr() as *const T) })
    }

    /// The header stored at offset 0.
    fn header<H: SharedPlacement>(&self) -> Result<&H, SharedMemoryError> {
        let size = std::mem::size_of::<H>();
        if self.len() < size {
            return Err(SharedMemoryError::InvalidLayout {
                reason: format!(
                    "segment of {} bytes cannot hold a {} byte header",
                    self.len(),
                    size
                ),
            });
        }
        // SAFETY: the trait contract makes the base 64-byte aligned, the size
        // was checked above, and H is a SharedPlacement type.
        Ok(unsafe { &*(self.base().as_ptr() as *const H) })
    }
}

/// Alignment of [`HeapSegment`] memory.
const HEAP_ALIGN: usize = 64;

/// Zero-filled segment in process-local memory.
///
/// Behaves like a mapped region for code that only needs handle resolution,
/// such as tests, benchmarks, or threads of one process.
pub struct HeapSegment {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: HeapSegment owns its allocation; concurrent access goes through
// SharedPlacement types or the unsafe slice accessors.
unsafe impl Send for HeapSegment {}

// SAFETY: see above.
unsafe impl Sync for HeapSegment {}

impl HeapSegment {
    /// Allocate `len` zeroed bytes.
    pub fn new(len: usize) -> Result<Self, SharedMemoryError> {
        if len == 0 {
            return Err(SharedMemoryError::InvalidLayout {
                reason: "segment length must be non-zero".to_string(),
            });
        }
        let layout = Layout::from_size_align(len, HEAP_ALIGN).map_err(|e| {
            SharedMemoryError::InvalidLayout {
                reason: e.to_string(),
            }
        })?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| SharedMemoryError::MapFailed {
            reason: format!("allocation of {} bytes failed", len),
        })?;
        Ok(Self { ptr, layout })
    }
}

// SAFETY: `ptr` owns `layout.size()` zeroed bytes aligned to HEAP_ALIGN (64)
// until drop.
unsafe impl Segment for HeapSegment {
    fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    fn len(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for HeapSegment {
    fn drop(&mut self) {
        // SAFETY: allocated in `new` with the same layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FrameHeader;
    use crate::sample::Sample;

    #[test]
    fn test_handle_round_trip() {
        let segment = HeapSegment::new(4096).unwrap();
        let base = segment.base().as_ptr();

        // SAFETY: 256 is inside the 4096 byte allocation.
        let ptr = unsafe { base.add(256) };
        let handle = segment.handle_of(ptr).unwrap();
        assert_eq!(handle, Handle::from_raw(256));
        assert_eq!(segment.resolve(handle, 16).unwrap().as_ptr(), ptr);
    }

    #[test]
    fn test_handle_of_outside_mapping() {
        let segment = HeapSegment::new(1024).unwrap();
        let base = segment.base().as_ptr();
        assert_eq!(segment.handle_of(base), None);
        assert_eq!(segment.handle_of(base.wrapping_add(1024)), None);
        assert_eq!(segment.handle_of(std::ptr::null()), None);
    }

    #[test]
    fn test_resolve_bounds() {
        let segment = HeapSegment::new(1024).unwrap();
        assert!(matches!(
            segment.resolve(Handle::NULL, 1),
            Err(SharedMemoryError::NullHandle)
        ));
        assert!(segment.resolve(Handle::from_raw(1000), 24).is_ok());
        assert!(matches!(
            segment.resolve(Handle::from_raw(1000), 25),
            Err(SharedMemoryError::HandleOutOfBounds { .. })
        ));
        assert!(segment.resolve(Handle::from_raw(u64::MAX), 1).is_err());
    }

    #[test]
    fn test_get_checks_alignment() {
        let segment = HeapSegment::new(1024).unwrap();
        assert!(segment.get::<Sample>(Handle::from_raw(64)).is_ok());
        assert!(matches!(
            segment.get::<Sample>(Handle::from_raw(65)),
            Err(SharedMemoryError::MisalignedHandle { align: 8, .. })
        ));
    }

    #[test]
    fn test_zeroed_segment_holds_empty_header() {
        let segment = HeapSegment::new(128).unwrap();
        let header: &FrameHeader = segment.header().unwrap();
        assert!(!header.snapshot().is_published());

        let tiny = HeapSegment::new(16).unwrap();
        assert!(tiny.header::<FrameHeader>().is_err());
    }

    #[test]
    fn test_slice_mut_visible_through_slice() {
        let segment = HeapSegment::new(512).unwrap();
        let handle = Handle::from_raw(128);
        // SAFETY: single-threaded test, the two slices do not overlap in time.
        unsafe {
            segment.slice_mut(handle, 4).unwrap().copy_from_slice(&[1, 2, 3, 4]);
            assert_eq!(segment.slice(handle, 4).unwrap(), &[1, 2, 3, 4]);
        }
    }
}
