// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Paths and labels of the `/proc` files read by the samplers.

/// CPU jiffies, running processes and context switches.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Memory totals in kibibytes.
pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

/// Per-device block I/O counters.
pub const PROC_DISKSTATS_PATH: &str = "/proc/diskstats";

/// Per-interface network counters.
pub const PROC_NET_DEV_PATH: &str = "/proc/net/dev";

pub const LOOPBACK_INTERFACE: &str = "lo";

/// Virtual and device-mapper block devices left out of the disk totals.
pub const VIRTUAL_DISK_PREFIXES: [&str; 4] = ["loop", "ram", "zram", "dm-"];

pub const PROCS_RUNNING_KEY: &str = "procs_running";
pub const CONTEXT_SWITCHES_KEY: &str = "ctxt";

pub(crate) const KIB: u64 = 1024;
