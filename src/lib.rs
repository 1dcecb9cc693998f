// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-process shared buffers for a controlling process and its render
// server. Buffers are created by one process (the owner), described to the
// other through a handle-free transfer descriptor, and reclaimed exactly once
// using a one-byte release flag segment plus an owner-side garbage queue.

pub mod naming;

mod platform;

mod error;
pub use error::{Error, Result};

mod segment;
pub use segment::Segment;

mod element;
pub use element::{Element, ElementType};

mod release_flag;

mod garbage;
pub use garbage::GarbageQueue;

mod buffer;
pub use buffer::{Role, SharedBuffer, TransferDescriptor};

pub mod interop;
pub use interop::ArrayInterface;

mod pool;
pub use pool::{BufferPool, PoolConfig};

mod registry;
pub use registry::{NamedBufferRef, NamedBuffers};
