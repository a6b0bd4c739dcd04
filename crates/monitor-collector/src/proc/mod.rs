// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! `/proc` parsing for the system samplers.
//!
//! Every reader takes the path to parse, so samplers pass the live `/proc`
//! paths from [`constants`] and tests point them at fixture files.
//!
//! ```text
//! /proc/
//!   ├── stat        # CPU jiffies, ctxt, procs_running
//!   ├── meminfo     # MemTotal, MemAvailable (kB)
//!   ├── diskstats   # per-device I/O counters
//!   └── net/dev     # per-interface RX/TX counters
//! ```

pub mod constants;

use std::fs::{self, File};
use std::io::{self, BufRead};
use std::path::Path;

use constants::{KIB, LOOPBACK_INTERFACE, VIRTUAL_DISK_PREFIXES};
use tracing::trace;

use crate::error::CollectorError;

/// Cumulative jiffies of the aggregate `cpu` line of `/proc/stat`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// Jiffies spent outside idle and iowait.
    pub busy: u64,
    /// Jiffies across user, nice, system, idle, iowait, irq, softirq and steal.
    pub total: u64,
}

impl CpuTimes {
    /// Busy share of the jiffies elapsed since `earlier`, in percent.
    ///
    /// Returns `None` when no jiffies elapsed. Counters that went backwards
    /// count as zero.
    pub fn usage_since(&self, earlier: &CpuTimes) -> Option<f64> {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return None;
        }
        let busy = self.busy.saturating_sub(earlier.busy).min(total);
        Some(busy as f64 / total as f64 * 100.0)
    }
}

/// Parses the aggregate `cpu` line:
///
/// ```text
/// cpu  user nice system idle iowait irq softirq steal guest guest_nice
/// ```
///
/// Guest time is already part of user time and is left out.
pub fn read_cpu_times_from_path(path: &Path) -> Result<CpuTimes, CollectorError> {
    let reader = open(path)?;

    for line in reader.lines() {
        let line = line.map_err(|source| io_error(path, source))?;
        let mut values = line.split_whitespace();
        if values.next() != Some("cpu") {
            continue;
        }

        let jiffies = values
            .take(8)
            .map(|s| s.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CollectorError::parse(path, format!("invalid cpu jiffies: {e}")))?;
        if jiffies.len() < 4 {
            return Err(CollectorError::parse(
                path,
                format!("expected at least 4 cpu columns, found {}", jiffies.len()),
            ));
        }

        let idle = jiffies[3] + jiffies.get(4).copied().unwrap_or(0);
        let total: u64 = jiffies.iter().sum();
        return Ok(CpuTimes {
            busy: total - idle,
            total,
        });
    }

    Err(CollectorError::parse(path, "aggregate cpu line not found"))
}

/// Reads a single-valued `key value` line of `/proc/stat`, such as `ctxt`.
pub fn read_stat_counter_from_path(path: &Path, key: &str) -> Result<u64, CollectorError> {
    let reader = open(path)?;

    for line in reader.lines() {
        let line = line.map_err(|source| io_error(path, source))?;
        let mut values = line.split_whitespace();
        if values.next() != Some(key) {
            continue;
        }
        return values
            .next()
            .ok_or_else(|| CollectorError::parse(path, format!("{key} has no value")))?
            .parse::<u64>()
            .map_err(|e| CollectorError::parse(path, format!("invalid {key} value: {e}")));
    }

    Err(CollectorError::parse(path, format!("{key} not found")))
}

/// Memory totals from `/proc/meminfo`, in bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemInfo {
    /// Share of memory that is not available, in percent.
    pub fn usage_percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        used as f64 / self.total_bytes as f64 * 100.0
    }
}

/// ```text
/// MemTotal:       16303428 kB
/// MemFree:          873340 kB
/// MemAvailable:    9262780 kB
/// ```
pub fn read_meminfo_from_path(path: &Path) -> Result<MemInfo, CollectorError> {
    let contents = fs::read_to_string(path).map_err(|source| io_error(path, source))?;

    let mut total = None;
    let mut available = None;
    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            _ => continue,
        };
        let kib = rest
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<u64>().ok())
            .ok_or_else(|| CollectorError::parse(path, format!("invalid {} value", key.trim())))?;
        *slot = Some(kib * KIB);
    }

    match (total, available) {
        (Some(total_bytes), Some(available_bytes)) => Ok(MemInfo {
            total_bytes,
            available_bytes,
        }),
        (None, _) => Err(CollectorError::parse(path, "MemTotal not found")),
        (_, None) => Err(CollectorError::parse(path, "MemAvailable not found")),
    }
}

/// Completed I/O operations summed over whole physical block devices.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskTotals {
    pub reads_completed: u64,
    pub writes_completed: u64,
}

/// ```text
///    8       0 sda 12345 100 500000 4000 6789 200 300000 9000 0 8000 13000
///    8       1 sda1 12000 90 490000 3900 6700 190 290000 8900 0 7900 12800
/// ```
///
/// Column 4 is reads completed and column 8 writes completed. Partitions and
/// device-mapper targets repeat the I/O of the disk beneath them, so only
/// whole disks are counted; loop and RAM devices are skipped too.
pub fn read_disk_totals_from_path(path: &Path) -> Result<DiskTotals, CollectorError> {
    let reader = open(path)?;
    let mut totals = DiskTotals::default();
    let mut disks: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|source| io_error(path, source))?;
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.is_empty() {
            continue;
        }
        if columns.len() < 8 {
            return Err(CollectorError::parse(
                path,
                format!("expected at least 8 columns, found {}", columns.len()),
            ));
        }

        let device = columns[2];
        if VIRTUAL_DISK_PREFIXES
            .iter()
            .any(|prefix| device.starts_with(prefix))
        {
            trace!("Skipping virtual block device {device}");
            continue;
        }
        if let Some(disk) = disks.iter().find(|disk| is_partition_of(device, disk)) {
            trace!("Skipping partition {device} of {disk}");
            continue;
        }

        let reads = parse_column(path, device, columns[3])?;
        let writes = parse_column(path, device, columns[7])?;
        totals.reads_completed += reads;
        totals.writes_completed += writes;
        disks.push(device.to_string());
    }

    Ok(totals)
}

/// `sda1` of `sda`, `nvme0n1p2` of `nvme0n1`, `mmcblk0p1` of `mmcblk0`.
///
/// The kernel lists a disk before its partitions.
fn is_partition_of(device: &str, disk: &str) -> bool {
    let Some(suffix) = device.strip_prefix(disk) else {
        return false;
    };
    let number = if disk.ends_with(|c: char| c.is_ascii_digit()) {
        suffix.strip_prefix('p').unwrap_or("")
    } else {
        suffix
    };
    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

/// Bytes received and transmitted, summed over every interface but loopback.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// ```text
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets ...
///   eth0: 1800      10    0    0    0     0          0         0     2540      10 ...
/// ```
///
/// The two header lines carry no `:` and are skipped. The interface name may
/// be glued to the first counter, so lines are split on the colon first.
pub fn read_network_totals_from_path(path: &Path) -> Result<NetworkTotals, CollectorError> {
    let reader = open(path)?;
    let mut totals = NetworkTotals::default();

    for line in reader.lines() {
        let line = line.map_err(|source| io_error(path, source))?;
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };
        let interface = interface.trim();
        if interface == LOOPBACK_INTERFACE {
            continue;
        }

        let mut values = counters.split_whitespace();
        let rx = values
            .next()
            .ok_or_else(|| CollectorError::parse(path, format!("{interface} has no counters")))?;
        // Skip the 7 remaining receive columns.
        let tx = values.nth(7).ok_or_else(|| {
            CollectorError::parse(path, format!("{interface} has no transmit counters"))
        })?;

        totals.rx_bytes += parse_column(path, interface, rx)?;
        totals.tx_bytes += parse_column(path, interface, tx)?;
    }

    Ok(totals)
}

fn open(path: &Path) -> Result<io::BufReader<File>, CollectorError> {
    File::open(path)
        .map(io::BufReader::new)
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: io::Error) -> CollectorError {
    CollectorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_column(path: &Path, owner: &str, value: &str) -> Result<u64, CollectorError> {
    value
        .parse::<u64>()
        .map_err(|e| CollectorError::parse(path, format!("invalid counter '{value}' for {owner}: {e}")))
}
