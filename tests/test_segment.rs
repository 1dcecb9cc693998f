// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Segment primitive: create/open/close by name and size.

use std::io;

use malt_ipc::naming::BufferId;
use malt_ipc::Segment;

fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", BufferId::generate())
}

#[test]
fn create_then_open_shares_memory() {
    let name = unique_name("seg_share");
    let mut owner = Segment::create(&name, 512).expect("create");
    assert_eq!(owner.size(), 512);
    assert!(!owner.data().is_null());

    let msg = b"Shared memory test data";
    owner.as_bytes_mut()[..msg.len()].copy_from_slice(msg);

    let peer = Segment::open(&name, 512).expect("open");
    assert_eq!(&peer.as_bytes()[..msg.len()], msg);
    // Independent mappings of the same object.
    assert_ne!(peer.data(), owner.data());

    peer.close(false);
    owner.close(true);
}

#[test]
fn peer_writes_are_visible_to_owner() {
    let name = unique_name("seg_peer_write");
    let owner = Segment::create(&name, 64).expect("create");
    let mut peer = Segment::open(&name, 64).expect("open");

    peer.as_bytes_mut()[0..4].copy_from_slice(&0xdead_beef_u32.to_ne_bytes());
    let mut word = [0u8; 4];
    word.copy_from_slice(&owner.as_bytes()[0..4]);
    assert_eq!(u32::from_ne_bytes(word), 0xdead_beef);

    peer.close(false);
    owner.close(true);
}

#[test]
fn create_existing_fails() {
    let name = unique_name("seg_exists");
    let first = Segment::create(&name, 128).expect("create");

    let err = Segment::create(&name, 128).expect_err("second create must fail");
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

    first.close(true);
}

#[test]
fn open_nonexistent_fails() {
    let name = unique_name("seg_missing");
    let err = Segment::open(&name, 128).expect_err("open must fail");
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[test]
fn open_with_larger_size_fails() {
    let name = unique_name("seg_size");
    let owner = Segment::create(&name, 64).expect("create");

    assert!(Segment::open(&name, 1 << 20).is_err());

    owner.close(true);
}

#[test]
fn invalid_arguments_are_rejected() {
    let err = Segment::create("", 16).expect_err("empty name");
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    let err = Segment::create(&unique_name("seg_zero"), 0).expect_err("zero size");
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}

#[test]
fn owner_close_destroys_segment() {
    let name = unique_name("seg_owner_close");
    let owner = Segment::create(&name, 256).expect("create");
    owner.close(true);

    assert!(Segment::open(&name, 256).is_err());
}

#[test]
fn non_owner_close_keeps_segment() {
    let name = unique_name("seg_peer_close");
    let owner = Segment::create(&name, 256).expect("create");

    let peer = Segment::open(&name, 256).expect("open");
    peer.close(false);

    let again = Segment::open(&name, 256).expect("still open-able after peer close");
    again.close(false);
    owner.close(true);
}

#[cfg(unix)]
#[test]
fn drop_without_close_only_unmaps() {
    let name = unique_name("seg_drop");
    drop(Segment::create(&name, 32).expect("create"));

    let peer = Segment::open(&name, 32).expect("object outlives the mapping");
    peer.close(true);
    assert!(Segment::open(&name, 32).is_err());
}

#[cfg(unix)]
#[test]
fn unlink_by_name_removes_segment() {
    let name = unique_name("seg_unlink");
    let owner = Segment::create(&name, 32).expect("create");

    Segment::unlink_by_name(&name);
    assert!(Segment::open(&name, 32).is_err());

    // The existing mapping stays usable.
    assert_eq!(owner.as_bytes().len(), 32);
    owner.close(false);
}
