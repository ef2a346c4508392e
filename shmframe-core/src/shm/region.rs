// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! SharedMemoryRegion - POSIX shared memory wrapper.
//!
//! Owns one `shm_open` + `mmap` mapping. Each process mapping the same name
//! gets its own base address; handles stay valid across all of them.

use std::ffi::CString;
use std::ptr::NonNull;

use crate::error::SharedMemoryError;
use crate::shm::Segment;

/// A mapped shared memory segment.
///
/// The creator owns the name and unlinks it on drop; openers only unmap.
/// Payload and sample blocks inside the segment are freed with it.
pub struct SharedMemoryRegion {
    /// Name of the shared memory object, without the leading slash.
    name: String,
    ptr: NonNull<u8>,
    size: usize,
    fd: i32,
    /// Whether this instance created the object (and unlinks it on drop).
    is_owner: bool,
}

// SAFETY: SharedMemoryRegion owns its mapping and can move between threads.
unsafe impl Send for SharedMemoryRegion {}

// SAFETY: shared access goes through SharedPlacement types (atomics) or the
// unsafe slice accessors, whose callers provide synchronization.
unsafe impl Sync for SharedMemoryRegion {}

impl SharedMemoryRegion {
    /// Minimum size for a shared memory region.
    pub const MIN_SIZE: usize = 4096;

    /// Maximum size for a shared memory region (1 GB).
    pub const MAX_SIZE: usize = 1024 * 1024 * 1024;

    /// Create and zero-fill a new named region.
    ///
    /// Fails if the name is already in use. A zero-filled region already
    /// holds an unpublished frame header at offset 0.
    pub fn create(name: &str, size: usize) -> Result<Self, SharedMemoryError> {
        let c_name = Self::validate(name, size)?;

        // SAFETY: c_name is a valid CString, flags are valid POSIX flags
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };

        if fd < 0 {
            let errno = std::io::Error::last_os_error();
            let reason = if errno.raw_os_error() == Some(libc::EEXIST) {
                "Shared memory already exists".to_string()
            } else {
                format!("shm_open failed: {}", errno)
            };
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason,
            });
        }

        // SAFETY: fd is a valid file descriptor
        let result = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            // SAFETY: fd and c_name were created above
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("ftruncate failed: {}", errno),
            });
        }

        let ptr = match Self::map(fd, size) {
            Ok(ptr) => ptr,
            Err(e) => {
                // SAFETY: c_name names the object created above
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(e);
            }
        };

        // SAFETY: ptr maps exactly size writable bytes
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };

        tracing::debug!(name = %name, size = size, "Created shared memory region");

        Ok(Self {
            name: name.to_string(),
            ptr,
            size,
            fd,
            is_owner: true,
        })
    }

    /// Map an existing region created by another process.
    pub fn open(name: &str, size: usize) -> Result<Self, SharedMemoryError> {
        let c_name = Self::validate(name, size)?;

        // SAFETY: c_name is a valid CString
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("shm_open failed: {}", std::io::Error::last_os_error()),
            });
        }

        let actual = match Self::object_size(fd) {
            Ok(actual) => actual,
            Err(e) => {
                // SAFETY: fd is valid and not used afterwards
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };
        if actual < size {
            // SAFETY: fd is valid and not used afterwards
            unsafe { libc::close(fd) };
            return Err(SharedMemoryError::MapFailed {
                reason: format!(
                    "region {} holds {} bytes, {} requested",
                    name, actual, size
                ),
            });
        }

        let ptr = Self::map(fd, size)?;

        tracing::debug!(name = %name, size = size, "Opened shared memory region");

        Ok(Self {
            name: name.to_string(),
            ptr,
            size,
            fd,
            is_owner: false,
        })
    }

    fn validate(name: &str, size: usize) -> Result<CString, SharedMemoryError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!(
                    "Size {} is outside {}..={}",
                    size,
                    Self::MIN_SIZE,
                    Self::MAX_SIZE
                ),
            });
        }

        if name.is_empty() {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: "Name cannot be empty".to_string(),
            });
        }

        CString::new(format!("/{}", name)).map_err(|e| SharedMemoryError::CreateFailed {
            name: name.to_string(),
            reason: format!("Invalid name: {}", e),
        })
    }

    /// Current size of the object behind `fd`.
    fn object_size(fd: i32) -> Result<usize, SharedMemoryError> {
        // SAFETY: zeroed is a valid bit pattern for the plain C struct
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        // SAFETY: fd is valid and stat is a writable stat struct
        if unsafe { libc::fstat(fd, &mut stat) } < 0 {
            return Err(SharedMemoryError::MapFailed {
                reason: format!("fstat failed: {}", std::io::Error::last_os_error()),
            });
        }
        usize::try_from(stat.st_size).map_err(|_| SharedMemoryError::MapFailed {
            reason: format!("invalid object size {}", stat.st_size),
        })
    }

    /// Map `size` bytes of `fd`, closing `fd` on failure.
    fn map(fd: i32, size: usize) -> Result<NonNull<u8>, SharedMemoryError> {
        // SAFETY: fd is valid, size is validated, offset 0 is valid
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            let errno = std::io::Error::last_os_error();
            // SAFETY: fd is valid and not used afterwards
            unsafe { libc::close(fd) };
            return Err(SharedMemoryError::MapFailed {
                reason: format!("mmap failed: {}", errno),
            });
        }

        NonNull::new(ptr as *mut u8).ok_or_else(|| SharedMemoryError::MapFailed {
            reason: "mmap returned null".to_string(),
        })
    }

    /// Get the name of this shared memory region.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of this shared memory region.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Raw pointer to the start of the mapping.
    ///
    /// Callers must synchronize any non-atomic access themselves.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Get a slice view of the shared memory.
    ///
    /// # Safety
    /// Caller must ensure no concurrent writes to the accessed region.
    pub unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), self.size)
    }

    /// Get a mutable slice view of the shared memory.
    ///
    /// # Safety
    /// Caller must ensure exclusive access to the accessed region.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size)
    }
}

// SAFETY: `ptr` maps `size` readable and writable bytes until drop, `open`
// refuses objects smaller than `size`, and mmap returns page-aligned
// addresses.
unsafe impl Segment for SharedMemoryRegion {
    fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    fn len(&self) -> usize {
        self.size
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during creation
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }

        // SAFETY: fd was opened during creation
        unsafe { libc::close(self.fd) };

        if self.is_owner {
            if let Ok(c_name) = CString::new(format!("/{}", self.name)) {
                // SAFETY: c_name is a valid CString
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                tracing::debug!(name = %self.name, "Unlinked shared memory region");
            }
        }
    }
}
