// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Named, generation-versioned segments.

use malt_ipc::naming::BufferId;
use malt_ipc::{Error, NamedBufferRef, NamedBuffers};

fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", BufferId::generate())
}

#[test]
fn first_load_creates_generation_zero() {
    let name = unique_name("lights");
    let mut buffers = NamedBuffers::new();

    let values = buffers.load::<f32>(&name, 256).expect("load");
    assert_eq!(values.len(), 256);
    values[0] = 3.0;

    assert_eq!(buffers.generation(&name), Some(0));
    let full = buffers.full_name(&name).expect("full name").to_owned();
    assert_eq!(full, format!("MALT_SHARED_MEM_{name}_GEN_0"));

    let peer = NamedBufferRef::open(&full, 1024).expect("open");
    assert_eq!(peer.name(), full);
    assert_eq!(peer.as_slice::<f32>(256).unwrap()[0], 3.0);
}

#[test]
fn smaller_request_keeps_generation() {
    let name = unique_name("scene");
    let mut buffers = NamedBuffers::new();

    buffers.load::<u32>(&name, 64).expect("load")[5] = 9;
    let again = buffers.load::<u32>(&name, 16).expect("load");
    assert_eq!(again.len(), 16);
    assert_eq!(again[5], 9);
    assert_eq!(buffers.generation(&name), Some(0));
    assert_eq!(buffers.len(), 1);
}

#[test]
fn larger_request_starts_new_generation() {
    let name = unique_name("mesh");
    let mut buffers = NamedBuffers::new();

    buffers.load::<u8>(&name, 100).expect("load");
    let old = buffers.full_name(&name).unwrap().to_owned();

    let grown = buffers.load::<u8>(&name, 1000).expect("grow");
    assert_eq!(grown.len(), 1000);
    assert_eq!(buffers.generation(&name), Some(1));
    let new = buffers.full_name(&name).unwrap().to_owned();
    assert!(new.ends_with("_GEN_1"));

    // Previous generation was destroyed.
    assert!(matches!(
        NamedBufferRef::open(&old, 100),
        Err(Error::OpenFailed { .. })
    ));
    NamedBufferRef::open(&new, 1000).expect("current generation");
}

#[test]
fn peer_mapping_outlives_owner_table() {
    let name = unique_name("tex");
    let mut buffers = NamedBuffers::new();
    buffers.load::<i32>(&name, 4).expect("load").copy_from_slice(&[1, 2, 3, 4]);
    let full = buffers.full_name(&name).unwrap().to_owned();

    let peer = NamedBufferRef::open(&full, 16).expect("open");
    drop(buffers);

    assert_eq!(peer.as_slice::<i32>(4).unwrap(), &[1, 2, 3, 4]);
    drop(peer);
    assert!(NamedBufferRef::open(&full, 16).is_err());
}

#[test]
fn peer_view_is_bounded() {
    let name = unique_name("small");
    let mut buffers = NamedBuffers::new();
    buffers.load::<u8>(&name, 8).expect("load");
    let full = buffers.full_name(&name).unwrap().to_owned();

    let peer = NamedBufferRef::open(&full, 8).expect("open");
    assert!(matches!(
        peer.as_slice::<u32>(3),
        Err(Error::CapacityExceeded {
            requested: 12,
            capacity: 8
        })
    ));
    assert_eq!(peer.as_slice::<u32>(2).unwrap().len(), 2);
}

#[test]
fn unknown_name_has_no_full_name() {
    let buffers = NamedBuffers::new();
    assert!(buffers.is_empty());
    assert_eq!(buffers.full_name("nothing"), None);
    assert_eq!(buffers.generation("nothing"), None);
}

#[test]
fn non_ascii_name_is_rejected() {
    let mut buffers = NamedBuffers::new();
    let name = "é".repeat(20);

    assert!(matches!(
        buffers.load::<u8>(&name, 8),
        Err(Error::InvalidId(n)) if n == name
    ));
    assert!(matches!(buffers.load::<u8>("", 8), Err(Error::InvalidId(_))));
    assert!(buffers.is_empty());
}
