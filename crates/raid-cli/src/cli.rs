use clap::{Args, Parser, Subcommand, ValueEnum};

use raid_rs::layout::stripe::RaidType;
use raid_rs::retention::array::ArrayConfig;
use raid_rs::stats::DEFAULT_HISTORY;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a concurrent read/write workload with random fault injection and repair.
    Simulate(SimulateArgs),

    /// Answer JSON-lines requests from stdin on stdout.
    Relay(ArrayArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ArrayArgs {
    #[arg(long, env = "RAID_MODE", value_enum, default_value_t = RaidMode::Raid3)]
    pub raid: RaidMode,

    #[arg(long, env = "RAID_DISKS", default_value_t = 4)]
    pub disks: usize,

    #[arg(long, env = "RAID_SECTOR_SIZE", default_value_t = 32)]
    pub sector_size: usize,

    #[arg(long, env = "RAID_SECTOR_COUNT", default_value_t = 128)]
    pub sector_count: usize,

    #[arg(long, env = "RAID_LATENCY_HISTORY", default_value_t = DEFAULT_HISTORY)]
    pub latency_history: usize,
}

impl ArrayArgs {
    pub fn config(&self) -> ArrayConfig {
        ArrayConfig {
            raid_type: self.raid.into(),
            disks: self.disks,
            sector_size: self.sector_size,
            sector_count: self.sector_count,
            latency_history: self.latency_history,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub array: ArrayArgs,

    #[arg(long, env = "SIM_WORKERS", default_value_t = 4)]
    pub workers: usize,

    #[arg(long, env = "SIM_OPS_PER_WORKER", default_value_t = 500)]
    pub ops_per_worker: usize,

    /// Share of operations that are reads.
    #[arg(long, env = "SIM_READ_RATIO", default_value_t = 0.5, value_parser = parse_ratio)]
    pub read_ratio: f64,

    #[arg(long, env = "SIM_STATUS_INTERVAL_MS", default_value_t = 1000)]
    pub status_interval_ms: u64,

    /// Mean time between injected faults; 0 disables fault injection.
    #[arg(long, env = "SIM_MEAN_FAULT_INTERVAL_MS", default_value_t = 200)]
    pub mean_fault_interval_ms: u64,

    #[arg(long, env = "SIM_REPAIR_DELAY_MS", default_value_t = 50)]
    pub repair_delay_ms: u64,

    #[arg(long, env = "SIM_SEED")]
    pub seed: Option<u64>,
}

/// `parse_ratio` accepts a finite share in `[0, 1]`.
fn parse_ratio(raw: &str) -> Result<f64, String> {
    let ratio: f64 = raw.parse().map_err(|e| format!("{raw:?} is not a number: {e}"))?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(format!("{raw} is outside [0, 1]"));
    }
    Ok(ratio)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RaidMode {
    Raid0,
    Raid1,
    Raid3,
}

impl From<RaidMode> for RaidType {
    fn from(mode: RaidMode) -> Self {
        match mode {
            RaidMode::Raid0 => Self::Stripe,
            RaidMode::Raid1 => Self::Mirror,
            RaidMode::Raid3 => Self::Parity,
        }
    }
}
