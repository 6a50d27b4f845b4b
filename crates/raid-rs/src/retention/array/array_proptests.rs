//! Property tests for the array layouts.
//!
//! 1. Round trip: a read returns what was written, with and without one lost member.
//! 2. Parity invariant: the parity member holds the XOR of the data members.
//! 3. Tolerance: mirrors survive N-1 losses, parity one, stripes none.
//! 4. Repair: rebuilding is idempotent and restores full redundancy.

use proptest::prelude::*;

use crate::error::RaidError;
use crate::layout::chunk::parity_of;
use crate::layout::stripe::RaidType;
use crate::retention::array::{Array, ArrayConfig};

const SECTORS: usize = 4;

fn array(raid_type: RaidType, disks: usize, sector_size: usize) -> Array {
    Array::new(&ArrayConfig {
        raid_type,
        disks,
        sector_size,
        sector_count: SECTORS,
        ..ArrayConfig::default()
    })
    .expect("valid config")
}

/// Strategy for `(disks, sector_size, payload)` where the payload splits evenly over
/// `data_disks(disks)` members.
fn layout_case(
    raid_type: RaidType,
    disks: std::ops::RangeInclusive<usize>,
) -> impl Strategy<Value = (usize, usize, Vec<u8>)> {
    (disks, 1usize..=8).prop_flat_map(move |(n, sector_size)| {
        let data = match raid_type {
            RaidType::Stripe => n,
            RaidType::Mirror => 1,
            RaidType::Parity => n - 1,
        };
        (1..=sector_size).prop_flat_map(move |chunk| {
            prop::collection::vec(any::<u8>(), data * chunk)
                .prop_map(move |payload| (n, sector_size, payload))
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_parity_round_trip_with_one_lost_data_disk(
        (n, sector_size, payload) in layout_case(RaidType::Parity, 2..=6),
        sector in 0..SECTORS,
        lost in any::<prop::sample::Index>(),
    ) {
        let a = array(RaidType::Parity, n, sector_size);
        a.write(sector, &payload)?;
        prop_assert_eq!(&a.read(sector)?.bytes, &payload);

        let lost = lost.index(n - 1);
        a.inject_fault(lost)?;
        let out = a.read(sector)?;
        prop_assert_eq!(&out.bytes, &payload);
        prop_assert!(out.reconstructed);
    }

    #[test]
    fn prop_parity_member_is_xor_of_data(
        (n, sector_size, payload) in layout_case(RaidType::Parity, 2..=6),
        sector in 0..SECTORS,
    ) {
        let a = array(RaidType::Parity, n, sector_size);
        a.write(sector, &payload)?;

        let data: Vec<Vec<u8>> = (0..n - 1)
            .map(|i| a.read_raw(i, sector))
            .collect::<Result<_, _>>()?;
        let expected = parity_of(data.iter().map(Vec::as_slice));
        prop_assert_eq!(a.read_raw(n - 1, sector)?, expected.into_bytes());
    }

    #[test]
    fn prop_parity_double_fault_is_unrecoverable(
        (n, sector_size, payload) in layout_case(RaidType::Parity, 3..=6),
        picks in any::<(prop::sample::Index, prop::sample::Index)>(),
    ) {
        let a = array(RaidType::Parity, n, sector_size);
        a.write(0, &payload)?;

        let first = picks.0.index(n);
        let second = (first + 1 + picks.1.index(n - 1)) % n;
        a.inject_fault(first)?;
        a.inject_fault(second)?;
        prop_assert!(
            matches!(a.read(0), Err(RaidError::Unrecoverable { .. })),
            "losing {} and {} must not read back",
            first,
            second
        );
    }

    #[test]
    fn prop_mirror_survives_all_but_one(
        (n, sector_size, payload) in layout_case(RaidType::Mirror, 2..=5),
        survivor in any::<prop::sample::Index>(),
    ) {
        let a = array(RaidType::Mirror, n, sector_size);
        a.write(1, &payload)?;

        let survivor = survivor.index(n);
        for id in (0..n).filter(|&id| id != survivor) {
            a.inject_fault(id)?;
        }
        prop_assert_eq!(a.read(1)?.bytes, payload);
    }

    #[test]
    fn prop_stripe_round_trip_and_no_tolerance(
        (n, sector_size, payload) in layout_case(RaidType::Stripe, 1..=5),
        lost in any::<prop::sample::Index>(),
    ) {
        let a = array(RaidType::Stripe, n, sector_size);
        a.write(2, &payload)?;
        prop_assert_eq!(&a.read(2)?.bytes, &payload);

        a.inject_fault(lost.index(n))?;
        prop_assert!(matches!(a.read(2), Err(RaidError::Unrecoverable { .. })), "stripe read after loss");
    }

    #[test]
    fn prop_repair_is_idempotent_and_restores_redundancy(
        raid_type in prop_oneof![Just(RaidType::Mirror), Just(RaidType::Parity)],
        seed in prop::collection::vec(any::<u8>(), 24),
        picks in any::<(prop::sample::Index, prop::sample::Index)>(),
    ) {
        let n = 4;
        let a = array(raid_type, n, 8);
        let payload = &seed[..a.data_disks() * 6];
        for sector in 0..SECTORS {
            a.write(sector, payload)?;
        }

        let first = picks.0.index(n);
        a.inject_fault(first)?;
        a.repair(first)?;
        let again = a.repair(first)?;
        prop_assert_eq!(again.sectors_rebuilt, 0);

        let second = (first + 1 + picks.1.index(n - 1)) % n;
        a.inject_fault(second)?;
        for sector in 0..SECTORS {
            prop_assert_eq!(&a.read(sector)?.bytes[..], payload);
        }
    }
}
