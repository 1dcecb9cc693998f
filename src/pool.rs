// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owner-side pool that recycles shared buffers once their consumer has set
// the release flag, instead of allocating a fresh segment pair per request.

use std::sync::Arc;

use tracing::debug;

use crate::buffer::SharedBuffer;
use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::garbage::GarbageQueue;

/// Allocation policy for [`BufferPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Smallest segment the pool allocates, in bytes.
    pub min_allocation: usize,
    /// New segments hold `requested * growth_factor` bytes (at least
    /// `min_allocation`, never less than `requested`), leaving room for
    /// later, larger requests.
    pub growth_factor: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_allocation: 1024 * 1024,
            growth_factor: 2,
        }
    }
}

/// Reusable owner buffers.
///
/// A pooled buffer becomes available again once its release flag reads
/// `true`, i.e. after the process it was transferred to dropped it. A buffer
/// handed out but never transferred stays busy. Dropping the pool releases
/// every buffer through the owner protocol.
pub struct BufferPool {
    config: PoolConfig,
    queue: Arc<GarbageQueue>,
    buffers: Vec<SharedBuffer>,
}

impl BufferPool {
    pub fn new(config: PoolConfig) -> Self {
        Self::with_queue(config, Arc::clone(GarbageQueue::global()))
    }

    pub fn with_queue(config: PoolConfig, queue: Arc<GarbageQueue>) -> Self {
        Self {
            config,
            queue,
            buffers: Vec::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Hand out a buffer typed as `element_count` elements of `element_type`.
    ///
    /// Picks the smallest available buffer that fits; allocates a new one
    /// when none does. The returned buffer's flag reads `false`.
    pub fn acquire(
        &mut self,
        element_type: ElementType,
        element_count: usize,
    ) -> Result<&mut SharedBuffer> {
        let requested = element_type
            .size()
            .checked_mul(element_count)
            .ok_or(Error::CapacityExceeded {
                requested: usize::MAX,
                capacity: 0,
            })?;

        let reuse = self
            .buffers
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_released() && b.capacity() >= requested)
            .min_by_key(|(_, b)| b.capacity())
            .map(|(i, _)| i);

        if let Some(i) = reuse {
            let buffer = &mut self.buffers[i];
            debug!(id = %buffer.id(), requested, "reusing pooled buffer");
            buffer.recycle(element_type, element_count)?;
            return Ok(buffer);
        }

        let capacity = requested
            .saturating_mul(self.config.growth_factor)
            .max(self.config.min_allocation)
            .max(requested)
            .max(1);
        let mut buffer =
            SharedBuffer::with_capacity_in(&self.queue, ElementType::UInt8, capacity, capacity)?;
        // Dropped untransferred on failure, which reclaims it.
        buffer.recycle(element_type, element_count)?;
        self.buffers.push(buffer);
        let index = self.buffers.len() - 1;
        Ok(&mut self.buffers[index])
    }

    /// Total buffers held, busy or not.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Buffers whose consumer has finished and that can be handed out again.
    pub fn available(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_released()).count()
    }
}
