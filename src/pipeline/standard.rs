//! The standard RAM evaluation table, parameterised by [`Config`].

use std::fmt;

use anyhow::{bail, Result};
use tracing::warn;

use super::{Phase, Pipeline, Step};
use crate::{config::Config, locate::Locator};

/// Packages providing every tool the standard table runs.
pub const PACKAGES: &[&str] = &["dmidecode", "lshw", "hwinfo", "stress-ng", "sysbench", "mbw"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Zypper,
    Pacman,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl PackageManager {
    /// Probe order for `auto`.
    pub const ALL: [PackageManager; 4] = [Self::Apt, Self::Dnf, Self::Zypper, Self::Pacman];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "apt" | "apt-get" => Some(Self::Apt),
            "dnf" => Some(Self::Dnf),
            "zypper" => Some(Self::Zypper),
            "pacman" => Some(Self::Pacman),
            _ => None,
        }
    }

    pub fn detect(locator: &Locator) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|pm| locator.locate(pm.program()).is_some())
    }

    pub fn program(self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
            Self::Zypper => "zypper",
            Self::Pacman => "pacman",
        }
    }

    pub fn refresh_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Apt => &["update"],
            Self::Dnf => &["makecache"],
            Self::Zypper => &["--non-interactive", "refresh"],
            Self::Pacman => &["-Sy", "--noconfirm"],
        };
        args.iter().map(|s| s.to_string()).collect()
    }

    pub fn install_args(self, packages: &[&str]) -> Vec<String> {
        let prefix: &[&str] = match self {
            Self::Apt | Self::Dnf => &["install", "-y"],
            Self::Zypper => &["--non-interactive", "install"],
            Self::Pacman => &["-S", "--needed", "--noconfirm"],
        };
        prefix
            .iter()
            .chain(packages.iter())
            .map(|s| s.to_string())
            .collect()
    }
}

/// Tunables for the stability and throughput steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuning {
    pub stress_workers: usize,
    pub stress_vm_percent: usize,
    pub stress_timeout: String,
    pub sysbench_threads: usize,
    pub sysbench_block_size: String,
    pub sysbench_total_size: String,
    pub mbw_runs: usize,
    pub mbw_size_mb: usize,
}

impl Tuning {
    pub fn from_config(cfg: &Config) -> Self {
        let mut stress_vm_percent = cfg.get_usize("STRESS_VM_PERCENT");
        if stress_vm_percent > 100 {
            warn!(value = stress_vm_percent, "STRESS_VM_PERCENT above 100, clamping");
            stress_vm_percent = 100;
        }
        Self {
            stress_workers: cfg.get_usize("STRESS_WORKERS"),
            stress_vm_percent,
            stress_timeout: cfg.get_checked("STRESS_TIMEOUT", is_duration),
            sysbench_threads: cfg.get_usize("SYSBENCH_THREADS"),
            sysbench_block_size: cfg.get_checked("SYSBENCH_BLOCK_SIZE", is_size),
            sysbench_total_size: cfg.get_checked("SYSBENCH_TOTAL_SIZE", is_size),
            mbw_runs: cfg.get_usize("MBW_RUNS"),
            mbw_size_mb: cfg.get_usize("MBW_SIZE_MB"),
        }
    }
}

/// `90`, `90s`, `5m`, `1h`, `1d`.
pub fn is_duration(value: &str) -> bool {
    has_number_then_unit(value, "smhd")
}

/// `512`, `1K`, `1M`, `10G`, `1T` (case-insensitive unit).
pub fn is_size(value: &str) -> bool {
    has_number_then_unit(&value.to_ascii_uppercase(), "KMGT")
}

fn has_number_then_unit(value: &str, units: &str) -> bool {
    let digits = value.trim_end_matches(|c: char| units.contains(c));
    let unit_len = value.len() - digits.len();
    unit_len <= 1
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits.parse::<u64>().map(|n| n > 0).unwrap_or(false)
}

/// Resolves `PACKAGE_MANAGER` (`auto` asks the locator).
pub fn package_manager(cfg: &Config, locator: &Locator) -> Result<Option<PackageManager>> {
    let name = cfg.get("PACKAGE_MANAGER").unwrap_or_else(|| "auto".into());
    match name.as_str() {
        "auto" => Ok(PackageManager::detect(locator)),
        "none" => Ok(None),
        other => match PackageManager::from_name(other) {
            Some(pm) => Ok(Some(pm)),
            None => bail!(
                "unknown PACKAGE_MANAGER '{}' (expected auto, none, apt, dnf, zypper or pacman)",
                other
            ),
        },
    }
}

pub fn install_steps(pm: PackageManager) -> Vec<Step> {
    vec![
        Step::builder("Refresh package index", Phase::Installing)
            .program(pm.program())
            .args(pm.refresh_args())
            .build(),
        Step::builder("Install diagnostic tools", Phase::Installing)
            .program(pm.program())
            .args(pm.install_args(PACKAGES))
            .build(),
    ]
}

pub fn identity_steps() -> Vec<Step> {
    vec![
        Step::builder("Memory modules (SMBIOS type 17)", Phase::CollectingIdentity)
            .program("dmidecode")
            .args(["--type", "17"])
            .build(),
        Step::builder("Memory controller (SMBIOS type 16)", Phase::CollectingIdentity)
            .program("dmidecode")
            .args(["--type", "16"])
            .build(),
        Step::builder("Memory summary (lshw)", Phase::CollectingIdentity)
            .program("lshw")
            .args(["-short", "-C", "memory"])
            .build(),
        Step::builder("Memory details (hwinfo)", Phase::CollectingIdentity)
            .program("hwinfo")
            .arg("--memory")
            .build(),
    ]
}

pub fn stability_step(t: &Tuning) -> Step {
    Step::builder("Memory stability (stress-ng verify)", Phase::StabilityTesting)
        .program("stress-ng")
        .args(["--vm".to_string(), t.stress_workers.to_string()])
        .args(["--vm-bytes".to_string(), format!("{}%", t.stress_vm_percent)])
        .args(["--vm-method", "all", "--verify"])
        .args(["--timeout".to_string(), t.stress_timeout.clone()])
        .arg("--metrics-brief")
        .build()
}

pub fn throughput_steps(t: &Tuning) -> Vec<Step> {
    vec![
        Step::builder("Memory throughput (sysbench)", Phase::ThroughputTesting)
            .program("sysbench")
            .arg("memory")
            .arg(format!("--threads={}", t.sysbench_threads))
            .arg(format!("--memory-block-size={}", t.sysbench_block_size))
            .arg(format!("--memory-total-size={}", t.sysbench_total_size))
            .arg("run")
            .build(),
        Step::builder("Memory bandwidth (mbw)", Phase::ThroughputTesting)
            .program("mbw")
            .args(["-n".to_string(), t.mbw_runs.to_string(), t.mbw_size_mb.to_string()])
            .build(),
    ]
}

/// Builds the full table. `pm` of `None` omits the install phase.
pub fn build(cfg: &Config, pm: Option<PackageManager>) -> Result<Pipeline> {
    let tuning = Tuning::from_config(cfg);
    let mut builder = Pipeline::builder();
    if let Some(pm) = pm {
        for step in install_steps(pm) {
            builder = builder.step(step);
        }
    }
    for step in identity_steps() {
        builder = builder.step(step);
    }
    builder = builder.step(stability_step(&tuning));
    for step in throughput_steps(&tuning) {
        builder = builder.step(step);
    }
    builder.build()
}
