// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named shared memory segment.
// Delegates to platform::PlatformShm (POSIX or Windows).

use std::fmt;
use std::io;

use tracing::{trace, warn};

use crate::platform::PlatformShm;

/// A named, inter-process shared memory region mapped into this process.
///
/// A segment is either *created* (this process owns the OS object) or
/// *opened* (another process owns it). [`Segment::close`] consumes the
/// handle, so each mapping is closed at most once. Dropping a segment
/// without closing it unmaps it and leaves the OS object alone.
pub struct Segment {
    name: String,
    inner: PlatformShm,
}

impl Segment {
    /// Create a segment of `size` bytes. Fails if `name` already exists.
    ///
    /// The content of a fresh segment is unspecified.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        let inner = PlatformShm::create(name, size)?;
        trace!(name, size, "segment created");
        Ok(Self {
            name: name.to_owned(),
            inner,
        })
    }

    /// Open an existing segment. Fails if `name` does not exist or its size
    /// does not match `size`.
    pub fn open(name: &str, size: usize) -> io::Result<Self> {
        let inner = PlatformShm::open(name, size)?;
        trace!(name, size, "segment opened");
        Ok(Self {
            name: name.to_owned(),
            inner,
        })
    }

    /// Logical segment name as passed to `create`/`open`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name handed to the operating system.
    pub fn platform_name(&self) -> &str {
        self.inner.name()
    }

    /// Pointer to the start of the mapped region.
    pub fn data(&self) -> *mut u8 {
        self.inner.as_mut_ptr()
    }

    /// Mapped size in bytes.
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.inner.as_ptr(), self.inner.size()) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.inner.as_mut_ptr(), self.inner.size()) }
    }

    /// Detach the local mapping; with `is_owner` also release the OS object.
    ///
    /// Best effort: failures are logged, never returned.
    pub fn close(self, is_owner: bool) {
        let Self { name, inner } = self;
        match inner.close(is_owner) {
            Ok(()) => trace!(name = %name, is_owner, "segment closed"),
            Err(err) => warn!(name = %name, is_owner, error = %err, "failed to close segment"),
        }
    }

    /// Remove a segment by name without an open handle (no-op on Windows).
    pub fn unlink_by_name(name: &str) {
        PlatformShm::unlink_by_name(name);
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("data", &self.data())
            .field("size", &self.size())
            .finish()
    }
}
