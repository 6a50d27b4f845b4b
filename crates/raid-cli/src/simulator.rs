use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Exp};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{info, warn};

use raid_rs::layout::stripe::RaidType;
use raid_rs::retention::array::Array;

use crate::cli::SimulateArgs;

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    writes: AtomicU64,
    failed_ops: AtomicU64,
    reconstructed_reads: AtomicU64,
    stale_reads: AtomicU64,
    faults_injected: AtomicU64,
    repairs: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn to_json(&self) -> Value {
        json!({
            "reads": self.reads.load(Ordering::Relaxed),
            "writes": self.writes.load(Ordering::Relaxed),
            "failed_ops": self.failed_ops.load(Ordering::Relaxed),
            "reconstructed_reads": self.reconstructed_reads.load(Ordering::Relaxed),
            "stale_reads": self.stale_reads.load(Ordering::Relaxed),
            "faults_injected": self.faults_injected.load(Ordering::Relaxed),
            "repairs": self.repairs.load(Ordering::Relaxed),
        })
    }
}

/// Simulator drives workers against one shared array until they finish or shutdown fires.
///
/// Worker `w` owns the sectors `s` with `s % workers == w`, so workers never race on a sector.
pub struct Simulator {
    array: Arc<Array>,
    args: SimulateArgs,
    counters: Arc<Counters>,
}

impl Simulator {
    pub fn new(array: Arc<Array>, args: SimulateArgs) -> Self {
        Self {
            array,
            args,
            counters: Arc::new(Counters::default()),
        }
    }

    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<Value> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.args.read_ratio),
            "read ratio {} is outside [0, 1]",
            self.args.read_ratio
        );
        let workers = self.args.workers.max(1);
        let (done_tx, done_rx) = watch::channel(false);

        let poller = tokio::spawn(poll_status(
            Arc::clone(&self.array),
            Arc::clone(&self.counters),
            Duration::from_millis(self.args.status_interval_ms.max(1)),
            done_rx.clone(),
        ));

        let injector = if self.array.raid_type() == RaidType::Stripe
            || self.args.mean_fault_interval_ms == 0
        {
            info!(raid_type = %self.array.raid_type(), "fault injection disabled");
            None
        } else {
            let mean = self.args.mean_fault_interval_ms as f64;
            let exp = Exp::new(1.0 / mean).context("invalid mean fault interval")?;
            Some(tokio::spawn(inject_faults(
                Arc::clone(&self.array),
                Arc::clone(&self.counters),
                exp,
                Duration::from_millis(self.args.repair_delay_ms),
                self.rng(u64::MAX),
                done_rx.clone(),
            )))
        };

        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let worker = Worker {
                    id: w,
                    workers,
                    ops: self.args.ops_per_worker,
                    read_ratio: self.args.read_ratio,
                    array: Arc::clone(&self.array),
                    counters: Arc::clone(&self.counters),
                    rng: self.rng(w as u64),
                    shutdown: shutdown.clone(),
                };
                tokio::task::spawn_blocking(move || worker.run())
            })
            .collect();

        for h in handles {
            h.await.context("worker panicked")?;
        }
        let _ = done_tx.send(true);

        if let Some(injector) = injector {
            injector.await.context("fault injector panicked")?;
        }
        poller.await.context("status poller panicked")?;

        // A fault injected right before shutdown may still be pending repair.
        for disk in self.array.disks().iter().filter(|d| d.is_failed()) {
            let array = Arc::clone(&self.array);
            let id = disk.id();
            match tokio::task::spawn_blocking(move || array.repair(id)).await? {
                Ok(_) => Counters::bump(&self.counters.repairs),
                Err(err) => warn!(disk = id, %err, "final repair failed"),
            }
        }

        let scrub = self.array.scrub();
        Ok(json!({
            "counters": self.counters.to_json(),
            "scrub": scrub,
            "status": self.array.get_status(),
        }))
    }

    fn rng(&self, stream: u64) -> StdRng {
        match self.args.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ stream.rotate_left(17)),
            None => StdRng::from_os_rng(),
        }
    }
}

struct Worker {
    id: usize,
    workers: usize,
    ops: usize,
    read_ratio: f64,
    array: Arc<Array>,
    counters: Arc<Counters>,
    rng: StdRng,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    fn run(mut self) {
        let sector_count = self.array.sector_count();
        if self.id >= sector_count {
            return;
        }
        let owned = (sector_count - self.id).div_ceil(self.workers);
        let width = self.array.stripe_width();
        let mut expected: HashMap<usize, Vec<u8>> = HashMap::new();

        for _ in 0..self.ops {
            if *self.shutdown.borrow() {
                break;
            }
            let sector = self.id + self.workers * self.rng.random_range(0..owned);
            if self.rng.random_bool(self.read_ratio) {
                self.read(sector, &expected);
            } else {
                let mut payload = vec![0u8; width];
                self.rng.fill_bytes(&mut payload);
                Counters::bump(&self.counters.writes);
                match self.array.write(sector, &payload) {
                    Ok(_) => {
                        expected.insert(sector, payload);
                    }
                    Err(_) => {
                        Counters::bump(&self.counters.failed_ops);
                        expected.remove(&sector);
                    }
                }
            }
        }
    }

    fn read(&self, sector: usize, expected: &HashMap<usize, Vec<u8>>) {
        Counters::bump(&self.counters.reads);
        match self.array.read(sector) {
            Ok(out) => {
                if out.reconstructed {
                    Counters::bump(&self.counters.reconstructed_reads);
                }
                if expected.get(&sector).is_some_and(|want| *want != out.bytes) {
                    warn!(worker = self.id, sector, "read returned stale data");
                    Counters::bump(&self.counters.stale_reads);
                }
            }
            Err(_) => Counters::bump(&self.counters.failed_ops),
        }
    }
}

async fn inject_faults(
    array: Arc<Array>,
    counters: Arc<Counters>,
    exp: Exp<f64>,
    repair_delay: Duration,
    mut rng: StdRng,
    mut done: watch::Receiver<bool>,
) {
    loop {
        let wait = Duration::from_secs_f64(exp.sample(&mut rng) / 1000.0);
        tokio::select! {
            () = tokio::time::sleep(wait) => {},
            _ = done.changed() => break,
        }
        if array.is_degraded() {
            continue;
        }

        let disk_id = rng.random_range(0..array.disks().len());
        let a = Arc::clone(&array);
        match tokio::task::spawn_blocking(move || a.inject_fault(disk_id)).await {
            Ok(Ok(())) => Counters::bump(&counters.faults_injected),
            Ok(Err(err)) => {
                warn!(disk = disk_id, %err, "fault injection failed");
                continue;
            }
            Err(err) => {
                warn!(%err, "fault injection task failed");
                break;
            }
        }

        tokio::time::sleep(repair_delay).await;
        let a = Arc::clone(&array);
        match tokio::task::spawn_blocking(move || a.repair(disk_id)).await {
            Ok(Ok(report)) => {
                Counters::bump(&counters.repairs);
                info!(
                    disk = disk_id,
                    sectors_rebuilt = report.sectors_rebuilt,
                    "simulated repair finished"
                );
            }
            Ok(Err(err)) => warn!(disk = disk_id, %err, "simulated repair failed"),
            Err(err) => {
                warn!(%err, "repair task failed");
                break;
            }
        }
    }
}

async fn poll_status(
    array: Arc<Array>,
    counters: Arc<Counters>,
    every: Duration,
    mut done: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = array.get_status();
                let failed = status.disks.iter().filter(|d| d.stats.errors > 0).count();
                info!(
                    raid_type = %status.raid_type,
                    degraded = status.degraded,
                    disks_with_errors = failed,
                    reads = counters.reads.load(Ordering::Relaxed),
                    writes = counters.writes.load(Ordering::Relaxed),
                    "status"
                );
            },
            _ = done.changed() => break,
        }
    }
}
