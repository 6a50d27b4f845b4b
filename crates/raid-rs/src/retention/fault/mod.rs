//! Explicit health transitions and rebuild of failed members.

#[cfg(test)]
mod fault_tests;

use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FaultError;
use crate::layout::stripe::RaidLayout;
use crate::layout::stripe::traits::stripe::Stripe;
use crate::retention::disk::{Health, VirtualDisk};

/// HealthTransition is one entry of the administrative health log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthTransition {
    pub disk_id: usize,
    pub from: Health,
    pub to: Health,
    pub at: SystemTime,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub disk_id: usize,
    /// Sectors that held data on the surviving members and were written back.
    pub sectors_rebuilt: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScrubRepair {
    pub sector: usize,
    pub disk_id: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScrubReport {
    pub sectors_checked: usize,
    pub repaired: Vec<ScrubRepair>,
    /// Slots whose stored checksum no longer matched their contents before the pass.
    pub checksum_mismatches: usize,
}

/// FaultManager drives the `Healthy -> Failed -> Healthy` cycle of array members.
///
/// Injection, repair and scrub are serialized by one manager lock. Regular I/O never takes it.
#[derive(Default)]
pub struct FaultManager {
    history: Mutex<Vec<HealthTransition>>,
    rebuild: Mutex<()>,
}

impl FaultManager {
    /// `inject_fault` marks a member failed and leaves its data in place.
    ///
    /// # Errors
    /// `UnknownDisk` when `disk_id` is not a member.
    pub fn inject_fault(&self, disks: &[VirtualDisk], disk_id: usize) -> Result<(), FaultError> {
        let disk = member(disks, disk_id)?;
        let _guard = self.rebuild.lock();

        let before = disk.set_health(Health::Failed);
        if before == Health::Failed {
            debug!(disk = disk_id, "fault injected into an already failed disk");
            return Ok(());
        }
        warn!(disk = disk_id, "disk marked failed");
        self.record(disk_id, before, Health::Failed);
        Ok(())
    }

    /// `repair` rebuilds every sector of a failed member from its peers and marks it healthy.
    ///
    /// Repairing a healthy member is a no-op. On error the member stays failed; sectors rebuilt
    /// before the error keep their new contents.
    ///
    /// # Errors
    /// `UnknownDisk` for a bad id, `NoRedundancy` when the layout cannot rebuild,
    /// `Unrecoverable` when a peer needed for the rebuild is failed.
    pub fn repair(
        &self,
        layout: &RaidLayout,
        disks: &[VirtualDisk],
        disk_id: usize,
    ) -> Result<RepairReport, FaultError> {
        let disk = member(disks, disk_id)?;
        let _guard = self.rebuild.lock();

        if !disk.is_failed() {
            debug!(disk = disk_id, "repair skipped, disk is healthy");
            return Ok(RepairReport {
                disk_id,
                sectors_rebuilt: 0,
            });
        }

        let Some(restorer) = layout.as_restore() else {
            let err = FaultError::NoRedundancy {
                disk_id,
                raid_type: layout.raid_type(),
            };
            warn!(disk = disk_id, %err, "repair refused");
            return Err(err);
        };

        let mut sectors_rebuilt = 0;
        for sector in 0..disk.sector_count() {
            match restorer.restore(disks, disk_id, sector) {
                Ok(true) => sectors_rebuilt += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(disk = disk_id, sector, %err, "rebuild aborted");
                    return Err(err);
                }
            }
        }

        disk.set_health(Health::Healthy);
        self.record(disk_id, Health::Failed, Health::Healthy);
        info!(
            disk = disk_id,
            raid_type = %layout.raid_type(),
            sectors_rebuilt,
            "disk repaired"
        );
        Ok(RepairReport {
            disk_id,
            sectors_rebuilt,
        })
    }

    /// `scrub` verifies every stored checksum, then lets the layout re-derive its redundancy
    /// sector by sector and rewrite members that disagree.
    pub fn scrub(&self, layout: &RaidLayout, disks: &[VirtualDisk]) -> ScrubReport {
        let _guard = self.rebuild.lock();
        let sector_count = disks.first().map_or(0, VirtualDisk::sector_count);
        let mut report = ScrubReport {
            sectors_checked: sector_count,
            ..ScrubReport::default()
        };

        for sector in 0..sector_count {
            for disk in disks.iter().filter(|d| !d.is_failed()) {
                if let Ok(false) = disk.verify_sector(sector) {
                    warn!(disk = disk.id(), sector, "checksum mismatch");
                    report.checksum_mismatches += 1;
                }
            }
            if let Some(restorer) = layout.as_restore() {
                report.repaired.extend(
                    restorer
                        .scrub(disks, sector)
                        .into_iter()
                        .map(|disk_id| ScrubRepair { sector, disk_id }),
                );
            }
        }

        info!(
            raid_type = %layout.raid_type(),
            sectors = sector_count,
            repaired = report.repaired.len(),
            checksum_mismatches = report.checksum_mismatches,
            "scrub finished"
        );
        report
    }

    /// `history` returns the recorded transitions, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<HealthTransition> {
        self.history.lock().clone()
    }

    fn record(&self, disk_id: usize, from: Health, to: Health) {
        self.history.lock().push(HealthTransition {
            disk_id,
            from,
            to,
            at: SystemTime::now(),
        });
    }
}

fn member(disks: &[VirtualDisk], disk_id: usize) -> Result<&VirtualDisk, FaultError> {
    disks.get(disk_id).ok_or(FaultError::UnknownDisk {
        disk_id,
        disks: disks.len(),
    })
}
