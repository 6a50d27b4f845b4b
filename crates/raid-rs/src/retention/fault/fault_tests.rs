use crate::error::FaultError;
use crate::layout::stripe::test_utils::disks;
use crate::layout::stripe::traits::stripe::Stripe;
use crate::layout::stripe::{RaidLayout, RaidType};
use crate::retention::disk::Health;
use crate::retention::fault::{FaultManager, RepairReport, ScrubRepair};

#[test]
fn inject_fault_marks_disk_failed_once() {
    let d = disks(3, 4, 2);
    let faults = FaultManager::default();

    faults.inject_fault(&d, 1).expect("inject");
    faults.inject_fault(&d, 1).expect("idempotent");

    assert_eq!(d[1].health(), Health::Failed);
    let history = faults.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].disk_id, 1);
    assert_eq!(history[0].from, Health::Healthy);
    assert_eq!(history[0].to, Health::Failed);
}

#[test]
fn inject_fault_rejects_unknown_disk() {
    let d = disks(2, 4, 1);
    assert_eq!(
        FaultManager::default().inject_fault(&d, 7),
        Err(FaultError::UnknownDisk {
            disk_id: 7,
            disks: 2,
        })
    );
}

#[test]
fn repair_rebuilds_parity_member_and_logs_transition() {
    let d = disks(4, 4, 3);
    let layout = RaidLayout::for_type(RaidType::Parity);
    layout.write(&d, 0, b"AAAABBBBCCCC").expect("write 0");
    layout.write(&d, 2, b"xxxxyyyyzzzz").expect("write 2");

    let faults = FaultManager::default();
    faults.inject_fault(&d, 1).expect("inject");
    let report = faults.repair(&layout, &d, 1).expect("repair");

    assert_eq!(
        report,
        RepairReport {
            disk_id: 1,
            sectors_rebuilt: 2,
        }
    );
    assert_eq!(d[1].health(), Health::Healthy);
    assert_eq!(d[1].read(0).expect("sector 0"), b"BBBB");
    assert_eq!(d[1].read(2).expect("sector 2"), b"yyyy");
    assert!(d[1].read_sector(1).expect("slot").is_none());

    let to: Vec<Health> = faults.history().iter().map(|t| t.to).collect();
    assert_eq!(to, [Health::Failed, Health::Healthy]);
}

#[test]
fn repair_of_healthy_disk_is_a_no_op() {
    let d = disks(2, 4, 1);
    let layout = RaidLayout::for_type(RaidType::Stripe);
    let faults = FaultManager::default();

    let report = faults.repair(&layout, &d, 0).expect("no-op");
    assert_eq!(report.sectors_rebuilt, 0);
    assert!(faults.history().is_empty());
}

#[test]
fn repair_on_stripe_has_no_redundancy() {
    let d = disks(2, 4, 1);
    let layout = RaidLayout::for_type(RaidType::Stripe);
    let faults = FaultManager::default();
    faults.inject_fault(&d, 0).expect("inject");

    assert_eq!(
        faults.repair(&layout, &d, 0),
        Err(FaultError::NoRedundancy {
            disk_id: 0,
            raid_type: RaidType::Stripe,
        })
    );
    assert_eq!(d[0].health(), Health::Failed);
}

#[test]
fn repair_with_failed_peer_leaves_disk_failed() {
    let d = disks(3, 2, 1);
    let layout = RaidLayout::for_type(RaidType::Parity);
    let faults = FaultManager::default();
    faults.inject_fault(&d, 0).expect("inject 0");
    faults.inject_fault(&d, 2).expect("inject 2");

    assert_eq!(
        faults.repair(&layout, &d, 0),
        Err(FaultError::Unrecoverable {
            disk_id: 0,
            failed: vec![2],
        })
    );
    assert_eq!(d[0].health(), Health::Failed);
}

#[test]
fn scrub_counts_corruption_and_restores_mirror_majority() {
    let d = disks(3, 4, 2);
    let layout = RaidLayout::for_type(RaidType::Mirror);
    layout.write(&d, 1, b"same").expect("write");
    d[2].corrupt(1, b"rot!");

    let faults = FaultManager::default();
    let report = faults.scrub(&layout, &d);

    assert_eq!(report.sectors_checked, 2);
    assert_eq!(report.checksum_mismatches, 1);
    assert_eq!(
        report.repaired,
        vec![ScrubRepair {
            sector: 1,
            disk_id: 2,
        }]
    );
    assert_eq!(d[2].read(1).expect("copy"), b"same");

    let again = faults.scrub(&layout, &d);
    assert_eq!(again.checksum_mismatches, 0);
    assert!(again.repaired.is_empty());
}

#[test]
fn scrub_on_stripe_only_verifies() {
    let d = disks(2, 2, 1);
    let layout = RaidLayout::for_type(RaidType::Stripe);
    layout.write(&d, 0, b"abcd").expect("write");
    d[0].corrupt(0, b"??");

    let report = FaultManager::default().scrub(&layout, &d);
    assert_eq!(report.checksum_mismatches, 1);
    assert!(report.repaired.is_empty());
}
