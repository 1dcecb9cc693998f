// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owner-side garbage queue: segment pairs whose reclamation waits for the
// release flag to read `true`.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::naming::BufferId;
use crate::release_flag::ReleaseFlag;
use crate::segment::Segment;

/// Payload and flag segments of a dropped owner buffer.
pub(crate) struct PendingRelease {
    pub(crate) id: BufferId,
    pub(crate) payload: Segment,
    pub(crate) flag: ReleaseFlag,
}

impl PendingRelease {
    /// Close both segments as owner.
    pub(crate) fn reclaim(self) {
        let Self { id, payload, flag } = self;
        payload.close(true);
        flag.close(true);
        debug!(%id, "shared buffer reclaimed");
    }
}

/// Process-local list of owner buffers pending reclamation.
///
/// There is no background sweep: [`GarbageQueue::collect`] runs after every
/// owner drop that enqueues, and may be called at any idle point.
#[derive(Default)]
pub struct GarbageQueue {
    pending: Mutex<Vec<PendingRelease>>,
}

impl GarbageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The queue used by [`crate::SharedBuffer::create`].
    pub fn global() -> &'static Arc<GarbageQueue> {
        static QUEUE: OnceLock<Arc<GarbageQueue>> = OnceLock::new();
        QUEUE.get_or_init(|| Arc::new(GarbageQueue::new()))
    }

    pub(crate) fn push(&self, entry: PendingRelease) {
        debug!(id = %entry.id, "shared buffer pending release");
        self.pending.lock().push(entry);
    }

    /// Sweep the queue: reclaim every entry whose flag reads `true`.
    /// Returns the number of buffers reclaimed.
    pub fn collect(&self) -> usize {
        let reclaimable: Vec<PendingRelease> = {
            let mut pending = self.pending.lock();
            let (done, waiting): (Vec<_>, Vec<_>) =
                pending.drain(..).partition(|e| e.flag.is_released());
            *pending = waiting;
            done
        };
        let n = reclaimable.len();
        reclaimable.into_iter().for_each(PendingRelease::reclaim);
        n
    }

    /// Number of buffers still waiting for their flag.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Whether the buffer `id` is waiting in this queue.
    pub fn contains(&self, id: &BufferId) -> bool {
        self.pending.lock().iter().any(|e| &e.id == id)
    }
}

impl Drop for GarbageQueue {
    fn drop(&mut self) {
        self.collect();
        let left = self.pending.get_mut();
        if !left.is_empty() {
            // Unmapped by Segment's Drop; the OS objects stay behind.
            warn!(count = left.len(), "garbage queue dropped with unreleased buffers");
        }
    }
}
