// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owner in this process, non-owner in a child process. The child is this
// same test binary re-run with only `child_reads_and_releases` selected and
// the descriptor passed through the environment.

use std::process::Command;
use std::sync::Arc;

use malt_ipc::{ElementType, GarbageQueue, SharedBuffer, TransferDescriptor};

const DESCRIPTOR_ENV: &str = "MALT_IPC_TEST_DESCRIPTOR";

fn run_child(descriptor: &TransferDescriptor) -> bool {
    let exe = std::env::current_exe().expect("test binary path");
    Command::new(exe)
        .args(["child_reads_and_releases", "--exact", "--test-threads=1"])
        .env(DESCRIPTOR_ENV, serde_json::to_string(descriptor).expect("serialize"))
        .status()
        .expect("spawn child")
        .success()
}

// Child side; does nothing unless spawned by a test below.
#[test]
fn child_reads_and_releases() {
    let Ok(json) = std::env::var(DESCRIPTOR_ENV) else {
        return;
    };
    let descriptor: TransferDescriptor = serde_json::from_str(&json).expect("descriptor");
    let mut buffer = SharedBuffer::reconstruct(descriptor).expect("reconstruct");

    let values = buffer.as_mut_slice::<f32>().expect("f32 view");
    assert_eq!(values[0], 1.5);
    values[1] = 2.5;
    buffer.release();
}

#[test]
fn child_consumer_signals_owner() {
    let queue = Arc::new(GarbageQueue::new());
    let mut owner = SharedBuffer::create_in(&queue, ElementType::Float32, 1024).expect("create");
    owner.as_mut_slice::<f32>().unwrap()[0] = 1.5;

    let descriptor = owner.transfer_out().expect("transfer");
    assert!(run_child(&descriptor), "child process failed");

    assert!(owner.is_released());
    assert_eq!(owner.as_slice::<f32>().unwrap()[1], 2.5);

    owner.release();
    assert!(queue.is_empty());
}

#[test]
fn child_opens_after_owner_dropped() {
    let queue = Arc::new(GarbageQueue::new());
    let mut owner = SharedBuffer::create_in(&queue, ElementType::Float32, 8).expect("create");
    owner.as_mut_slice::<f32>().unwrap()[0] = 1.5;
    let descriptor = owner.transfer_out().expect("transfer");

    owner.release();
    assert_eq!(queue.len(), 1);

    assert!(run_child(&descriptor), "child process failed");
    assert_eq!(queue.collect(), 1);
}
