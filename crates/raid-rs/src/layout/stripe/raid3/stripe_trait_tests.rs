use std::collections::BTreeSet;

use crate::error::RaidError;
use crate::layout::chunk::parity_of;
use crate::layout::stripe::raid3::RAID3;
use crate::layout::stripe::test_utils::{disks, disks_with_ids, fail};
use crate::layout::stripe::traits::restore::Restore;
use crate::layout::stripe::traits::stripe::Stripe;

#[test]
fn stripe_data_disks_matches_d_minus_one() {
    assert_eq!(RAID3.data_disks(4), 3);
    assert_eq!(RAID3::parity_idx(4), 3);
}

#[test]
fn stripe_write_sets_data_and_parity_then_read_returns_same() {
    let d = disks(4, 4, 4);
    let d0 = [1u8, 2, 3, 4];
    let d1 = [5u8, 6, 7, 8];
    let d2 = [9u8, 10, 11, 12];
    let payload: Vec<u8> = [d0, d1, d2].concat();

    RAID3.write(&d, 0, &payload).expect("write");

    assert_eq!(d[0].read(0).expect("d0"), d0);
    assert_eq!(d[1].read(0).expect("d1"), d1);
    assert_eq!(d[2].read(0).expect("d2"), d2);

    let expected_p = parity_of([&d0[..], &d1[..], &d2[..]]);
    assert_eq!(d[3].read(0).expect("parity"), expected_p.as_bytes());

    let out = RAID3.read(&d, 0).expect("read");
    assert_eq!(out.bytes, payload);
    assert!(!out.reconstructed);
}

#[test]
fn stripe_read_reconstructs_the_documented_scenario() {
    let d = disks(4, 4, 1);
    RAID3.write(&d, 0, b"AAAABBBBCCCC").expect("write");

    let parity: Vec<u8> = vec![b'A' ^ b'B' ^ b'C'; 4];
    assert_eq!(d[3].read(0).expect("parity"), parity);

    fail(&d, &[1]);
    let out = RAID3.read(&d, 0).expect("degraded read");
    assert_eq!(out.bytes, b"AAAABBBBCCCC");
    assert!(out.reconstructed);
}

#[test]
fn stripe_read_ignores_a_lost_parity_member() {
    let d = disks(3, 2, 1);
    RAID3.write(&d, 0, b"abcd").expect("write");
    fail(&d, &[2]);

    let out = RAID3.read(&d, 0).expect("read");
    assert_eq!(out.bytes, b"abcd");
    assert!(!out.reconstructed);
}

#[test]
fn stripe_read_with_two_lost_data_members_is_unrecoverable() {
    let d = disks(4, 4, 1);
    RAID3.write(&d, 0, b"AAAABBBBCCCC").expect("write");
    fail(&d, &[0, 2]);
    assert_eq!(
        RAID3.read(&d, 0),
        Err(RaidError::Unrecoverable {
            sector: 0,
            unavailable: vec![0, 2],
        })
    );
}

#[test]
fn stripe_read_with_data_and_parity_lost_is_unrecoverable() {
    let d = disks(4, 4, 1);
    RAID3.write(&d, 0, b"AAAABBBBCCCC").expect("write");
    fail(&d, &[1, 3]);
    assert_eq!(
        RAID3.read(&d, 0),
        Err(RaidError::Unrecoverable {
            sector: 0,
            unavailable: vec![1, 3],
        })
    );
}

#[test]
fn stripe_write_rejects_uneven_payload() {
    let d = disks(4, 4, 1);
    assert!(matches!(
        RAID3.write(&d, 0, b"AAAABBBBCCC"),
        Err(RaidError::InvalidArgument(_))
    ));
    assert_eq!(d[3].written_sectors(), 0);
}

#[test]
fn degraded_write_stays_readable_through_parity() {
    let d = disks(4, 4, 1);
    RAID3.write(&d, 0, b"AAAABBBBCCCC").expect("first write");
    fail(&d, &[0]);

    let err = RAID3.write(&d, 0, b"XXXXYYYYZZZZ").unwrap_err();
    assert_eq!(
        err,
        RaidError::PartialWriteFailure {
            sector: 0,
            failed_disk_ids: BTreeSet::from([0]),
        }
    );

    let out = RAID3.read(&d, 0).expect("reconstructed");
    assert_eq!(out.bytes, b"XXXXYYYYZZZZ");
    assert!(out.reconstructed);
}

#[test]
fn two_member_array_behaves_like_a_checked_mirror() {
    let d = disks(2, 4, 1);
    RAID3.write(&d, 0, b"solo").expect("write");
    assert_eq!(d[1].read(0).expect("parity"), b"solo");

    fail(&d, &[0]);
    assert_eq!(RAID3.read(&d, 0).expect("read").bytes, b"solo");
}

#[test]
fn stripe_as_restore_returns_some() {
    assert!(RAID3.as_restore().is_some());
}

#[test]
fn degenerate_member_counts_are_rejected() {
    assert_eq!(RAID3::parity_idx(0), 0);
    assert!(matches!(RAID3.read(&[], 0), Err(RaidError::InvalidArgument(_))));
    assert!(RAID3.scrub(&[], 0).is_empty());
    assert!(matches!(
        RAID3.write(&disks(1, 4, 1), 0, b"solo"),
        Err(RaidError::InvalidArgument(_))
    ));
}

#[test]
fn reconstruction_follows_positions_not_disk_ids() {
    let d = disks_with_ids([40, 41, 42, 43], 4, 1);
    RAID3.write(&d, 0, b"AAAABBBBCCCC").expect("write");
    fail(&d, &[2]);

    let out = RAID3.read(&d, 0).expect("degraded read");
    assert_eq!(out.bytes, b"AAAABBBBCCCC");
    assert!(out.reconstructed);

    fail(&d, &[0]);
    assert_eq!(
        RAID3.read(&d, 0),
        Err(RaidError::Unrecoverable {
            sector: 0,
            unavailable: vec![0, 2],
        })
    );
}
