// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Runs the shared buffer protocol across two real processes.
//
// Usage:
//   demo_share [count] [owner-first]
//   demo_share consume <descriptor-json>     (spawned by the owner)
//
// The owner fills <count> floats with 0..count, transfers the buffer to a
// child copy of itself, and either waits for the child before dropping
// (default) or drops its handle first and sweeps the garbage queue once the
// child exits. Set RUST_LOG=debug to watch the segments come and go.

use std::process::{Command, ExitCode};

use malt_ipc::{ElementType, GarbageQueue, SharedBuffer, TransferDescriptor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn consume(json: &str) -> Result<f32, Box<dyn std::error::Error>> {
    let descriptor: TransferDescriptor = serde_json::from_str(json)?;
    let buffer = SharedBuffer::reconstruct(descriptor)?;
    let sum: f32 = buffer.as_slice::<f32>()?.iter().sum();
    info!(id = %buffer.id(), "consumer read {} floats", buffer.element_count());
    buffer.release();
    Ok(sum)
}

fn own(count: usize, owner_first: bool) -> Result<(), Box<dyn std::error::Error>> {
    let queue = GarbageQueue::global();
    let mut buffer = SharedBuffer::create_in(queue, ElementType::Float32, count)?;
    for (i, v) in buffer.as_mut_slice::<f32>()?.iter_mut().enumerate() {
        *v = i as f32;
    }
    let json = serde_json::to_string(&buffer.transfer_out()?)?;

    let mut child = Command::new(std::env::current_exe()?)
        .args(["consume", &json])
        .spawn()?;

    if owner_first {
        buffer.release();
        info!(pending = queue.len(), "owner released before consumer");
        child.wait()?;
    } else {
        child.wait()?;
        info!(released = buffer.is_released(), "consumer exited");
        buffer.release();
    }

    let reclaimed = queue.collect();
    info!(reclaimed, pending = queue.len(), "garbage queue swept");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).map(String::as_str) == Some("consume") {
        let Some(json) = args.get(2) else {
            eprintln!("usage: demo_share consume <descriptor-json>");
            return ExitCode::FAILURE;
        };
        return match consume(json) {
            Ok(sum) => {
                println!("consumer sum: {sum}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "consumer failed");
                ExitCode::FAILURE
            }
        };
    }

    let count = match args.get(1).map(|s| s.parse::<usize>()) {
        None => 1024,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("usage: demo_share [count] [owner-first]");
            return ExitCode::FAILURE;
        }
    };
    let owner_first = args.get(2).map(String::as_str) == Some("owner-first");

    match own(count, owner_first) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "owner failed");
            ExitCode::FAILURE
        }
    }
}
