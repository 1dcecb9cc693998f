// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Long-lived segments addressed by a logical name rather than a random id.
// Growing a segment creates a new generation under a new name; peers learn
// the current name through `full_name` and open it with `NamedBufferRef`.

use std::collections::HashMap;
use std::fmt;
use std::mem::ManuallyDrop;

use tracing::debug;

use crate::element::{self, Element};
use crate::error::{Error, Result};
use crate::naming;
use crate::segment::Segment;

struct Generation {
    gen: u32,
    segment: Segment,
}

/// Owner-side table of named, generation-versioned segments.
#[derive(Default)]
pub struct NamedBuffers {
    segments: HashMap<String, Generation>,
}

impl NamedBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed view over the segment for `name`, holding at least
    /// `element_count` elements.
    ///
    /// The first call creates generation 0. A call needing more bytes than
    /// the current generation holds creates the next generation and
    /// destroys the previous one; its contents are not carried over.
    ///
    /// `name` must be non-empty printable ASCII without whitespace or path
    /// separators; anything else fails with [`Error::InvalidId`].
    pub fn load<T: Element>(&mut self, name: &str, element_count: usize) -> Result<&mut [T]> {
        if !naming::is_valid_logical_name(name) {
            return Err(Error::InvalidId(name.to_owned()));
        }
        let size = std::mem::size_of::<T>()
            .checked_mul(element_count)
            .ok_or(Error::CapacityExceeded {
                requested: usize::MAX,
                capacity: 0,
            })?
            .max(1);

        let next_gen = match self.segments.get(name) {
            None => Some(0),
            Some(current) if current.segment.size() < size => Some(current.gen + 1),
            Some(_) => None,
        };

        if let Some(gen) = next_gen {
            let full_name = naming::named_segment(name, gen);
            let segment = Segment::create(&full_name, size).map_err(|source| {
                Error::AllocationFailed {
                    name: full_name.clone(),
                    source,
                }
            })?;
            debug!(name = %full_name, size, "named segment created");
            if let Some(old) = self
                .segments
                .insert(name.to_owned(), Generation { gen, segment })
            {
                old.segment.close(true);
            }
        }

        let entry = self
            .segments
            .get_mut(name)
            .ok_or_else(|| Error::InvalidId(name.to_owned()))?;
        Ok(element::cast_mut(entry.segment.as_bytes_mut(), element_count))
    }

    /// Segment name of the current generation for `name`.
    pub fn full_name(&self, name: &str) -> Option<&str> {
        self.segments.get(name).map(|g| g.segment.name())
    }

    /// Current generation number for `name`.
    pub fn generation(&self, name: &str) -> Option<u32> {
        self.segments.get(name).map(|g| g.gen)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Drop for NamedBuffers {
    fn drop(&mut self) {
        for (_, g) in self.segments.drain() {
            g.segment.close(true);
        }
    }
}

impl fmt::Debug for NamedBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.segments.iter().map(|(k, g)| (k, g.segment.name())))
            .finish()
    }
}

/// Peer-side mapping of a named segment. Unmaps on drop, never destroys.
#[derive(Debug)]
pub struct NamedBufferRef {
    segment: ManuallyDrop<Segment>,
}

impl NamedBufferRef {
    /// Open the segment `full_name` (as returned by [`NamedBuffers::full_name`]).
    pub fn open(full_name: &str, size: usize) -> Result<Self> {
        let segment = Segment::open(full_name, size).map_err(|source| Error::OpenFailed {
            name: full_name.to_owned(),
            source,
        })?;
        Ok(Self {
            segment: ManuallyDrop::new(segment),
        })
    }

    pub fn name(&self) -> &str {
        self.segment.name()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.segment.as_bytes()
    }

    /// Typed view over the first `element_count` elements.
    pub fn as_slice<T: Element>(&self, element_count: usize) -> Result<&[T]> {
        let bytes = self.as_bytes();
        let requested = std::mem::size_of::<T>().saturating_mul(element_count);
        if requested > bytes.len() {
            return Err(Error::CapacityExceeded {
                requested,
                capacity: bytes.len(),
            });
        }
        Ok(element::cast(bytes, element_count))
    }
}

impl Drop for NamedBufferRef {
    fn drop(&mut self) {
        // Safety: taken exactly once, here.
        let segment = unsafe { ManuallyDrop::take(&mut self.segment) };
        segment.close(false);
    }
}
