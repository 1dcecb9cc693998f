// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// One-byte release flag shared by the owner and the non-owner of a buffer.
// The only state either side writes after the initial transfer.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::naming::BufferId;
use crate::segment::Segment;

/// The release flag segment of one shared buffer.
///
/// Starts `false`. Whichever side is done with the buffer writes `true`.
/// Writers only ever store `true`, so two racing writers are harmless.
#[derive(Debug)]
pub struct ReleaseFlag {
    segment: Segment,
}

impl ReleaseFlag {
    /// Create the flag segment for `id` and initialise it to `false`.
    pub(crate) fn create(id: &BufferId) -> io::Result<Self> {
        let segment = Segment::create(&id.flag_name(), 1)?;
        let flag = Self { segment };
        flag.cell().store(false, Ordering::Release);
        Ok(flag)
    }

    /// Open the flag segment created by the owner of `id`.
    pub(crate) fn open(id: &BufferId) -> io::Result<Self> {
        let segment = Segment::open(&id.flag_name(), 1)?;
        Ok(Self { segment })
    }

    fn cell(&self) -> &AtomicBool {
        // Only 0 and 1 are ever written, and AtomicBool has alignment 1.
        unsafe { &*(self.segment.data() as *const AtomicBool) }
    }

    pub fn is_released(&self) -> bool {
        self.cell().load(Ordering::Acquire)
    }

    /// Store `true`. Returns whether the flag was already set.
    pub fn mark_released(&self) -> bool {
        let was = self.cell().swap(true, Ordering::AcqRel);
        trace!(flag = self.segment.name(), was, "release flag set");
        was
    }

    /// Store `false` again. Owner only, for recycling a buffer whose
    /// consumer has finished.
    pub(crate) fn reset(&self) {
        self.cell().store(false, Ordering::Release);
        trace!(flag = self.segment.name(), "release flag reset");
    }

    pub(crate) fn close(self, is_owner: bool) {
        self.segment.close(is_owner);
    }
}
