// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Zero-copy description of a buffer for numerics libraries
// (the `__array_interface__` shape: pointer, type code, shape, read-only).

use crate::element::ElementType;

/// Array-interface type code: `f` float, `i` signed, `u` unsigned, `b` bool.
pub const fn type_code(ty: ElementType) -> char {
    match ty {
        ElementType::Float32 => 'f',
        ElementType::Int32 | ElementType::Int8 => 'i',
        ElementType::UInt32 | ElementType::UInt8 => 'u',
        ElementType::Bool => 'b',
    }
}

/// Read-only adapter handed to a numerics library to build an array view
/// over shared memory. Valid only while the buffer it came from is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInterface {
    /// Address of the first element.
    pub data: usize,
    pub type_code: char,
    pub item_size: usize,
    pub shape: Vec<usize>,
    pub read_only: bool,
}

impl ArrayInterface {
    pub(crate) fn new(data: *const u8, ty: ElementType, count: usize, read_only: bool) -> Self {
        Self {
            data: data as usize,
            type_code: type_code(ty),
            item_size: ty.size(),
            shape: vec![count],
            read_only,
        }
    }

    /// Full type string, e.g. `<f4`; single-byte types use `|` (no byte order).
    pub fn typestr(&self) -> String {
        let order = if self.item_size == 1 { '|' } else { '<' };
        format!("{order}{}{}", self.type_code, self.item_size)
    }
}
