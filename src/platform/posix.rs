// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX segment primitive: shm_open + ftruncate + mmap.
// Only the creating side unlinks; every other side just unmaps.

use std::ffi::CString;
use std::io;
use std::ptr;

use crate::naming;

const PERMS: libc::mode_t = 0o666; // S_IRUSR|S_IWUSR|S_IRGRP|S_IWGRP|S_IROTH|S_IWOTH

// ---------------------------------------------------------------------------
// PlatformShm: POSIX shared memory
// ---------------------------------------------------------------------------

pub struct PlatformShm {
    mem: *mut u8,
    size: usize,  // mapped size, equal to the size given at create/open
    name: String, // POSIX name (with leading '/')
}

// Safety: the mapping is process-shared by design; the handle only carries
// the address and never aliases Rust-owned memory.
unsafe impl Send for PlatformShm {}
unsafe impl Sync for PlatformShm {}

fn posix_name(name: &str, size: usize) -> io::Result<(String, CString)> {
    if name.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
    }
    if size == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
    }
    let posix = naming::make_shm_name(name);
    let c_name =
        CString::new(posix.as_bytes()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok((posix, c_name))
}

#[cfg(target_os = "macos")]
fn size_matches(actual: usize, requested: usize) -> bool {
    // macOS rounds shm objects up to a whole page.
    actual >= requested
}

#[cfg(not(target_os = "macos"))]
fn size_matches(actual: usize, requested: usize) -> bool {
    actual == requested
}

impl PlatformShm {
    /// Create a new segment of `size` bytes. Fails with `AlreadyExists` if the
    /// name is taken.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        let (posix, c_name) = posix_name(name, size)?;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                PERMS as libc::c_uint,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        // umask may have stripped group/other bits.
        unsafe { libc::fchmod(fd, PERMS) };

        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(err);
        }

        Self::map(fd, size, posix).map_err(|err| {
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
            err
        })
    }

    /// Open an existing segment. Fails with `NotFound` if it does not exist
    /// and with `InvalidData` if its size differs from `size`.
    pub fn open(name: &str, size: usize) -> io::Result<Self> {
        let (posix, c_name) = posix_name(name, size)?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, PERMS as libc::c_uint) };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(err);
        }
        let actual = st.st_size as usize;
        if !size_matches(actual, size) {
            unsafe { libc::close(fd) };
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("segment holds {actual} bytes, expected {size}"),
            ));
        }

        Self::map(fd, size, posix)
    }

    fn map(fd: i32, size: usize, name: String) -> io::Result<Self> {
        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        // The mapping keeps the object alive; the descriptor is not needed.
        unsafe { libc::close(fd) };

        if mem == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            mem: mem as *mut u8,
            size,
            name,
        })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.mem
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.mem
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unmap, and when `is_owner` also unlink the name so the kernel frees
    /// the object once every other mapping is gone.
    pub fn close(mut self, is_owner: bool) -> io::Result<()> {
        let unmapped = self.unmap();
        let unlinked = if is_owner { self.unlink() } else { Ok(()) };
        unmapped.and(unlinked)
    }

    fn unmap(&mut self) -> io::Result<()> {
        if self.mem.is_null() {
            return Ok(());
        }
        let ret = unsafe { libc::munmap(self.mem as *mut libc::c_void, self.size) };
        self.mem = ptr::null_mut();
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn unlink(&self) -> io::Result<()> {
        let c_name = CString::new(self.name.as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Unlink a named segment without an open handle. Errors are ignored.
    pub fn unlink_by_name(name: &str) {
        let posix = naming::make_shm_name(name);
        if let Ok(c_name) = CString::new(posix.as_bytes()) {
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
        }
    }
}

impl Drop for PlatformShm {
    fn drop(&mut self) {
        // A handle dropped without `close` only gives up its mapping.
        let _ = self.unmap();
    }
}
