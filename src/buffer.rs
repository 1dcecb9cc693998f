// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared buffer: a typed view over a payload segment paired with a release
// flag segment, owned by the process that created it and borrowed by any
// process that reconstructs it from a transfer descriptor.

use std::fmt;
use std::io;
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::{self, Element, ElementType};
use crate::error::{Error, Result};
use crate::garbage::{GarbageQueue, PendingRelease};
use crate::interop::ArrayInterface;
use crate::naming::BufferId;
use crate::release_flag::ReleaseFlag;
use crate::segment::Segment;

/// Which side of the protocol a buffer handle is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Created the segments and destroys them.
    Owner,
    /// Reconstructed from a transfer; only maps and unmaps.
    NonOwner,
}

/// What crosses the process boundary when a buffer is sent.
///
/// Carries no pointers or handles; the receiver reopens both segments by the
/// names derived from `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDescriptor {
    pub id: BufferId,
    pub element_type: ElementType,
    pub element_count: usize,
    /// Size of the payload segment; at least `size_in_bytes()`.
    pub capacity: usize,
    /// Role of the sender at transfer time. The receiver is always a non-owner.
    pub role: Role,
}

impl TransferDescriptor {
    pub fn size_in_bytes(&self) -> Option<usize> {
        self.element_type.size().checked_mul(self.element_count)
    }
}

struct Mapped {
    payload: Segment,
    flag: ReleaseFlag,
}

enum Ownership {
    Owner {
        queue: Arc<GarbageQueue>,
        // Set once a descriptor has left this process; a consumer may exist.
        transferred: AtomicBool,
    },
    NonOwner,
}

/// A block of shared memory usable by two processes at once.
///
/// Dropping the last handle runs the release protocol for its role exactly
/// once:
///
/// - **Non-owner**: sets the release flag and unmaps both segments.
/// - **Owner**, flag already `true`: the consumer is done, so both segments
///   are destroyed immediately.
/// - **Owner**, flag `false`: the segments move to the garbage queue and are
///   destroyed by the first [`GarbageQueue::collect`] that sees the flag
///   set. A buffer that was never transferred sets the flag itself and is
///   reclaimed by the sweep that follows the drop.
///
/// Payload bytes are not synchronised; concurrent writers must coordinate
/// on their own.
pub struct SharedBuffer {
    id: BufferId,
    element_type: ElementType,
    element_count: usize,
    ownership: Ownership,
    mapped: ManuallyDrop<Mapped>,
}

fn layout_size(element_type: ElementType, element_count: usize) -> io::Result<usize> {
    element_type
        .size()
        .checked_mul(element_count)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "buffer size overflows usize"))
}

impl SharedBuffer {
    /// Allocate a buffer of `element_count` elements, reclaimed through
    /// [`GarbageQueue::global`].
    ///
    /// Contents are not zeroed.
    pub fn create(element_type: ElementType, element_count: usize) -> Result<Self> {
        Self::create_in(GarbageQueue::global(), element_type, element_count)
    }

    /// Like [`SharedBuffer::create`], with deferred reclamation through `queue`.
    pub fn create_in(
        queue: &Arc<GarbageQueue>,
        element_type: ElementType,
        element_count: usize,
    ) -> Result<Self> {
        let id = BufferId::generate();
        let size = layout_size(element_type, element_count).map_err(|source| {
            Error::AllocationFailed {
                name: id.payload_name(),
                source,
            }
        })?;
        // Zero-length buffers still get a one-byte segment.
        Self::allocate(queue, id, element_type, element_count, size.max(1))
    }

    pub(crate) fn with_capacity_in(
        queue: &Arc<GarbageQueue>,
        element_type: ElementType,
        element_count: usize,
        capacity: usize,
    ) -> Result<Self> {
        Self::allocate(queue, BufferId::generate(), element_type, element_count, capacity)
    }

    fn allocate(
        queue: &Arc<GarbageQueue>,
        id: BufferId,
        element_type: ElementType,
        element_count: usize,
        capacity: usize,
    ) -> Result<Self> {
        let payload_name = id.payload_name();
        let payload =
            Segment::create(&payload_name, capacity).map_err(|source| Error::AllocationFailed {
                name: payload_name,
                source,
            })?;
        let flag = match ReleaseFlag::create(&id) {
            Ok(flag) => flag,
            Err(source) => {
                payload.close(true);
                return Err(Error::AllocationFailed {
                    name: id.flag_name(),
                    source,
                });
            }
        };

        debug!(%id, ?element_type, element_count, capacity, "shared buffer created");
        Ok(Self {
            id,
            element_type,
            element_count,
            ownership: Ownership::Owner {
                queue: Arc::clone(queue),
                transferred: AtomicBool::new(false),
            },
            mapped: ManuallyDrop::new(Mapped { payload, flag }),
        })
    }

    /// Describe this buffer for another process.
    ///
    /// Fails with [`Error::InvalidTransfer`] once the release flag reads
    /// `true`; no segment is touched in that case.
    pub fn transfer_out(&self) -> Result<TransferDescriptor> {
        if self.mapped.flag.is_released() {
            return Err(Error::InvalidTransfer {
                id: self.id.to_string(),
            });
        }
        if let Ownership::Owner { transferred, .. } = &self.ownership {
            transferred.store(true, Ordering::Release);
        }
        Ok(TransferDescriptor {
            id: self.id.clone(),
            element_type: self.element_type,
            element_count: self.element_count,
            capacity: self.capacity(),
            role: self.role(),
        })
    }

    /// Rebuild a buffer from a received descriptor, as a non-owner.
    ///
    /// Fails with [`Error::OpenFailed`] if either segment is gone, which means
    /// the owner reclaimed it while the transfer was outstanding.
    pub fn reconstruct(descriptor: TransferDescriptor) -> Result<Self> {
        let TransferDescriptor {
            id,
            element_type,
            element_count,
            capacity,
            ..
        } = descriptor;

        let requested = layout_size(element_type, element_count).unwrap_or(usize::MAX);
        if requested > capacity {
            return Err(Error::CapacityExceeded {
                requested,
                capacity,
            });
        }

        let payload_name = id.payload_name();
        let payload =
            Segment::open(&payload_name, capacity).map_err(|source| Error::OpenFailed {
                name: payload_name,
                source,
            })?;
        let flag = match ReleaseFlag::open(&id) {
            Ok(flag) => flag,
            Err(source) => {
                payload.close(false);
                return Err(Error::OpenFailed {
                    name: id.flag_name(),
                    source,
                });
            }
        };

        debug!(%id, ?element_type, element_count, "shared buffer reconstructed");
        Ok(Self {
            id,
            element_type,
            element_count,
            ownership: Ownership::NonOwner,
            mapped: ManuallyDrop::new(Mapped { payload, flag }),
        })
    }

    /// Run the release protocol now instead of at scope exit.
    pub fn release(self) {
        drop(self);
    }

    pub fn id(&self) -> &BufferId {
        &self.id
    }

    pub fn role(&self) -> Role {
        match self.ownership {
            Ownership::Owner { .. } => Role::Owner,
            Ownership::NonOwner => Role::NonOwner,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// `element_type.size() * element_count`.
    pub fn size_in_bytes(&self) -> usize {
        self.element_type.size() * self.element_count
    }

    /// Size of the payload segment.
    pub fn capacity(&self) -> usize {
        self.mapped.payload.size()
    }

    /// Whether the release flag reads `true`.
    pub fn is_released(&self) -> bool {
        self.mapped.flag.is_released()
    }

    /// The payload segment handle.
    pub fn payload(&self) -> &Segment {
        &self.mapped.payload
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mapped.payload.as_bytes()[..self.size_in_bytes()]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.size_in_bytes();
        &mut self.mapped.payload.as_bytes_mut()[..len]
    }

    fn check_type<T: Element>(&self) -> Result<()> {
        if self.element_type.viewable_as::<T>() {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: T::TYPE,
                actual: self.element_type,
            })
        }
    }

    /// Typed view of the payload.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.check_type::<T>()?;
        Ok(element::cast(self.mapped.payload.as_bytes(), self.element_count))
    }

    /// Mutable typed view of the payload.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_type::<T>()?;
        let count = self.element_count;
        Ok(element::cast_mut(self.mapped.payload.as_bytes_mut(), count))
    }

    /// Array-interface description for zero-copy numeric views.
    ///
    /// Non-owner views are marked read-only.
    pub fn array_interface(&self) -> ArrayInterface {
        ArrayInterface::new(
            self.mapped.payload.data(),
            self.element_type,
            self.element_count,
            self.role() == Role::NonOwner,
        )
    }

    /// Reuse an owner buffer whose consumer has finished: clear the flag and
    /// change its element layout.
    pub(crate) fn recycle(&mut self, element_type: ElementType, element_count: usize) -> Result<()> {
        let requested = layout_size(element_type, element_count).unwrap_or(usize::MAX);
        if requested > self.capacity() {
            return Err(Error::CapacityExceeded {
                requested,
                capacity: self.capacity(),
            });
        }
        if let Ownership::Owner { transferred, .. } = &self.ownership {
            transferred.store(false, Ordering::Release);
        }
        self.mapped.flag.reset();
        self.element_type = element_type;
        self.element_count = element_count;
        Ok(())
    }
}

impl Drop for SharedBuffer {
    fn drop(&mut self) {
        // Safety: `mapped` is taken exactly once, here.
        let Mapped { payload, flag } = unsafe { ManuallyDrop::take(&mut self.mapped) };
        match &self.ownership {
            Ownership::NonOwner => {
                flag.mark_released();
                payload.close(false);
                flag.close(false);
                debug!(id = %self.id, "non-owner released shared buffer");
            }
            Ownership::Owner { queue, transferred } => {
                let entry = PendingRelease {
                    id: self.id.clone(),
                    payload,
                    flag,
                };
                if entry.flag.is_released() {
                    entry.reclaim();
                    return;
                }
                if !transferred.load(Ordering::Acquire) {
                    // No consumer can exist.
                    entry.flag.mark_released();
                }
                queue.push(entry);
                queue.collect();
            }
        }
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("id", &self.id)
            .field("role", &self.role())
            .field("element_type", &self.element_type)
            .field("element_count", &self.element_count)
            .field("capacity", &self.capacity())
            .finish()
    }
}
