// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Segment naming: random buffer ids, the payload/flag name pair derived from
// each id, and the POSIX name mangling applied to every segment name.

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Prefix of a buffer's payload segment.
pub const PAYLOAD_PREFIX: &str = "MALT_SHARED_";
/// Prefix of a buffer's one-byte release flag segment.
pub const FLAG_PREFIX: &str = "MALT_FLAG_";
/// Prefix of generation-versioned named segments (see [`crate::NamedBuffers`]).
pub const NAMED_PREFIX: &str = "MALT_SHARED_MEM_";
/// Number of characters in a [`BufferId`].
pub const ID_LEN: usize = 16;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random 16-character alphanumeric token naming one shared buffer.
///
/// Collisions are not checked for; with 62^16 ids the odds are negligible and
/// a collision surfaces as an `AllocationFailed` on create.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BufferId(String);

fn random_u64() -> u64 {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    // RandomState carries per-instance random SipHash keys.
    let mut h = RandomState::new().build_hasher();
    h.write_u64(SEQ.fetch_add(1, Ordering::Relaxed));
    h.write_u32(std::process::id());
    if let Ok(now) = SystemTime::now().duration_since(UNIX_EPOCH) {
        h.write_u128(now.as_nanos());
    }
    h.finish()
}

impl BufferId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        let mut id = String::with_capacity(ID_LEN);
        let mut bits = 0u64;
        for i in 0..ID_LEN {
            // 62^8 < 2^64: eight characters per random word.
            if i % 8 == 0 {
                bits = random_u64();
            }
            id.push(ALPHABET[(bits % 62) as usize] as char);
            bits /= 62;
        }
        Self(id)
    }

    /// Validate an id received from another process.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(Error::InvalidId(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the payload segment: `MALT_SHARED_<id>`.
    pub fn payload_name(&self) -> String {
        format!("{PAYLOAD_PREFIX}{}", self.0)
    }

    /// Name of the release flag segment: `MALT_FLAG_<id>`.
    pub fn flag_name(&self) -> String {
        format!("{FLAG_PREFIX}{}", self.0)
    }
}

impl TryFrom<String> for BufferId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        Self::parse(&s)
    }
}

impl From<BufferId> for String {
    fn from(id: BufferId) -> String {
        id.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BufferId({})", self.0)
    }
}

/// Name of generation `gen` of a named segment: `MALT_SHARED_MEM_<name>_GEN_<gen>`.
pub fn named_segment(name: &str, gen: u32) -> String {
    format!("{NAMED_PREFIX}{name}_GEN_{gen}")
}

// ---------------------------------------------------------------------------
// POSIX name mangling
// ---------------------------------------------------------------------------

/// FNV-1a 64-bit hash.
pub fn fnv1a_64(data: &[u8]) -> u64 {
    data.iter().fold(0xcbf29ce484222325, |hash, &b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

/// Maximum length for POSIX shm names, leading '/' included. 0 = unlimited.
///
/// On macOS `PSHMNAMLEN` is 31. On Linux the limit is typically 255.
#[cfg(target_os = "macos")]
pub const SHM_NAME_MAX: usize = 31;

#[cfg(not(target_os = "macos"))]
pub const SHM_NAME_MAX: usize = 0;

/// Produce a POSIX shm-safe name (with leading '/').
///
/// Names longer than [`SHM_NAME_MAX`] keep as much of their prefix as fits
/// and end in `_<16 hex digits of FNV-1a>` of the full name.
pub fn make_shm_name(name: &str) -> String {
    let full = if name.starts_with('/') {
        name.to_owned()
    } else {
        format!("/{name}")
    };
    shorten(full, SHM_NAME_MAX)
}

/// Logical names for [`crate::NamedBuffers`]: non-empty printable ASCII,
/// no whitespace or path separators.
pub(crate) fn is_valid_logical_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b'/' && b != b'\\')
}

fn shorten(full: String, max: usize) -> String {
    if max == 0 || full.len() <= max {
        return full;
    }
    // '/' + prefix + '_' + 16 hex digits
    let keep = max.saturating_sub(1 + 1 + 16);
    let body = &full[1..];
    let mut end = keep.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    let prefix = &body[..end];
    format!("/{prefix}_{:016x}", fnv1a_64(full.as_bytes()))
}
