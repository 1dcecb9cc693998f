// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Element types a shared buffer can be viewed as.

use serde::{Deserialize, Serialize};

/// Element type recorded with a shared buffer and sent with its transfer
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Float32,
    Int32,
    UInt32,
    /// One byte per element, 0 or 1. Viewed through `u8`.
    Bool,
    Int8,
    UInt8,
}

impl ElementType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ElementType::Float32 | ElementType::Int32 | ElementType::UInt32 => 4,
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
        }
    }

    /// Whether a buffer of this type may be viewed as `T`.
    pub(crate) fn viewable_as<T: Element>(self) -> bool {
        T::TYPE == self || (self == ElementType::Bool && T::TYPE == ElementType::UInt8)
    }
}

/// Plain-old-data types that can be viewed directly over shared memory.
///
/// # Safety
/// Implementors must be valid for every bit pattern of their size and have
/// no padding, since the bytes come from another process.
pub unsafe trait Element: Copy + Send + Sync + 'static {
    const TYPE: ElementType;
}

unsafe impl Element for f32 {
    const TYPE: ElementType = ElementType::Float32;
}

unsafe impl Element for i32 {
    const TYPE: ElementType = ElementType::Int32;
}

unsafe impl Element for u32 {
    const TYPE: ElementType = ElementType::UInt32;
}

unsafe impl Element for i8 {
    const TYPE: ElementType = ElementType::Int8;
}

unsafe impl Element for u8 {
    const TYPE: ElementType = ElementType::UInt8;
}

/// Reinterpret the first `count` elements of a mapped region.
///
/// Mappings are page aligned, so alignment only needs a debug check.
pub(crate) fn cast<T: Element>(bytes: &[u8], count: usize) -> &[T] {
    debug_assert!(count * std::mem::size_of::<T>() <= bytes.len());
    debug_assert_eq!(bytes.as_ptr().align_offset(std::mem::align_of::<T>()), 0);
    unsafe { std::slice::from_raw_parts(bytes.as_ptr() as *const T, count) }
}

pub(crate) fn cast_mut<T: Element>(bytes: &mut [u8], count: usize) -> &mut [T] {
    debug_assert!(count * std::mem::size_of::<T>() <= bytes.len());
    debug_assert_eq!(bytes.as_ptr().align_offset(std::mem::align_of::<T>()), 0);
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut T, count) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(ElementType::Float32.size(), 4);
        assert_eq!(ElementType::UInt32.size(), 4);
        assert_eq!(ElementType::Bool.size(), 1);
        assert_eq!(ElementType::Int8.size(), 1);
    }

    #[test]
    fn bool_buffers_view_as_bytes() {
        assert!(ElementType::Bool.viewable_as::<u8>());
        assert!(!ElementType::Bool.viewable_as::<i8>());
        assert!(!ElementType::Float32.viewable_as::<u32>());
        assert!(ElementType::Float32.viewable_as::<f32>());
    }
}
