// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows segment primitive: pagefile-backed named file mappings.
// The kernel object lives until its last handle closes, so `close` on
// either side just unmaps the view and closes the handle.

use std::io;
use std::ptr;

use windows_sys::Win32::Foundation::HANDLE;

/// Encode a name as a null-terminated wide string for Win32 APIs.
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn check_args(name: &str, size: usize) -> io::Result<()> {
    if name.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
    }
    if size == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PlatformShm: Windows shared memory via file mapping
// ---------------------------------------------------------------------------

pub struct PlatformShm {
    handle: HANDLE,
    mem: *mut u8,
    size: usize,
    name: String,
}

unsafe impl Send for PlatformShm {}
unsafe impl Sync for PlatformShm {}

impl PlatformShm {
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::*;
        use windows_sys::Win32::System::Memory::*;

        check_args(name, size)?;
        let wide_name = to_wide(name);

        let size64 = size as u64;
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE | SEC_COMMIT,
                (size64 >> 32) as u32,
                size64 as u32,
                wide_name.as_ptr(),
            )
        };
        let err = unsafe { GetLastError() };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        if err == ERROR_ALREADY_EXISTS {
            unsafe { CloseHandle(handle) };
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "shm already exists",
            ));
        }

        Self::map(handle, size, name)
    }

    pub fn open(name: &str, size: usize) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::*;
        use windows_sys::Win32::System::Memory::*;

        check_args(name, size)?;
        let wide_name = to_wide(name);

        let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }

        let shm = Self::map(handle, size, name)?;

        // The view is page-granular, so only a too-small mapping is a mismatch.
        let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
        let ret = unsafe {
            VirtualQuery(
                shm.mem as *const _,
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if ret == 0 {
            return Err(io::Error::last_os_error());
        }
        if info.RegionSize < size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("segment holds {} bytes, expected {size}", info.RegionSize),
            ));
        }
        Ok(shm)
    }

    fn map(handle: HANDLE, size: usize, name: &str) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Memory::*;

        let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
        if view.Value.is_null() {
            let e = io::Error::last_os_error();
            unsafe { CloseHandle(handle) };
            return Err(e);
        }

        Ok(Self {
            handle,
            mem: view.Value as *mut u8,
            size,
            name: name.to_owned(),
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

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unmap the view and close the handle. `is_owner` has no extra effect:
    /// the kernel reclaims the mapping once every handle is closed.
    pub fn close(mut self, _is_owner: bool) -> io::Result<()> {
        self.release()
    }

    fn release(&mut self) -> io::Result<()> {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Memory::{UnmapViewOfFile, MEMORY_MAPPED_VIEW_ADDRESS};

        let mut result = Ok(());
        if !self.mem.is_null() {
            let view = MEMORY_MAPPED_VIEW_ADDRESS {
                Value: self.mem as *mut _,
            };
            if unsafe { UnmapViewOfFile(view) } == 0 {
                result = Err(io::Error::last_os_error());
            }
            self.mem = ptr::null_mut();
        }
        if !self.handle.is_null() {
            if unsafe { CloseHandle(self.handle) } == 0 && result.is_ok() {
                result = Err(io::Error::last_os_error());
            }
            self.handle = ptr::null_mut();
        }
        result
    }

    pub fn unlink_by_name(_name: &str) {
        // No-op on Windows: there is no name to remove.
    }
}

impl Drop for PlatformShm {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
