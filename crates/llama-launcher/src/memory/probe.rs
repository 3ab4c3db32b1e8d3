//! Host memory probe.
//!
//! Reads total physical memory and the part of it the OS will not hand to a
//! new process. On macOS that is wired plus compressor pages from `vm_stat`;
//! elsewhere it is `total - available` as reported by sysinfo.

use crate::error::{LaunchError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub wired_bytes: u64,
    pub compressed_bytes: u64,
}

impl MemorySnapshot {
    pub fn new(total_bytes: u64, wired_bytes: u64, compressed_bytes: u64) -> Self {
        Self {
            total_bytes,
            wired_bytes,
            compressed_bytes,
        }
    }

    /// Memory already claimed by the OS.
    pub fn reserved_bytes(&self) -> u64 {
        self.wired_bytes.saturating_add(self.compressed_bytes)
    }
}

pub trait MemoryProbe {
    /// `None` means the host offers no memory statistics; it is never a
    /// zero-filled snapshot.
    fn probe(&self) -> Option<MemorySnapshot>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemoryProbe;

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self) -> Result<MemorySnapshot> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(LaunchError::ProbeUnavailable);
        }

        let mut system = System::new();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(LaunchError::ProbeUnavailable);
        }

        #[cfg(target_os = "macos")]
        {
            if let Some(stats) = read_vm_stat() {
                debug!(
                    "vm_stat: page size {}, wired pages {}, compressor pages {}",
                    stats.page_size, stats.wired_pages, stats.compressed_pages
                );
                return Ok(MemorySnapshot::new(
                    total,
                    stats.wired_bytes(),
                    stats.compressed_bytes(),
                ));
            }
            warn!("vm_stat unavailable, falling back to sysinfo available memory");
        }

        let available = system.available_memory().min(total);
        debug!("sysinfo: total {} bytes, available {} bytes", total, available);
        Ok(MemorySnapshot::new(total, total - available, 0))
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn probe(&self) -> Option<MemorySnapshot> {
        match self.read() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Memory probe failed: {}. Memory advisories disabled.", e);
                None
            }
        }
    }
}

/// Page counters parsed from `vm_stat` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmStat {
    pub page_size: u64,
    pub wired_pages: u64,
    pub compressed_pages: u64,
}

impl VmStat {
    pub fn wired_bytes(&self) -> u64 {
        self.wired_pages.saturating_mul(self.page_size)
    }

    pub fn compressed_bytes(&self) -> u64 {
        self.compressed_pages.saturating_mul(self.page_size)
    }
}

lazy_static! {
    static ref PAGE_SIZE_REGEX: Regex = Regex::new(r"page size of (\d+) bytes").unwrap();
    static ref COUNTER_REGEX: Regex = Regex::new(r"^([^:]+):\s+(\d+)\.?\s*$").unwrap();
}

// 16 KiB pages on Apple Silicon.
const DEFAULT_PAGE_SIZE: u64 = 16384;

/// Returns `None` when neither counter is present.
pub fn parse_vm_stat(output: &str) -> Option<VmStat> {
    let page_size = PAGE_SIZE_REGEX
        .captures(output)
        .and_then(|c| c[1].parse::<u64>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let mut wired = None;
    let mut compressed = None;

    for line in output.lines() {
        let Some(caps) = COUNTER_REGEX.captures(line.trim()) else {
            continue;
        };
        let value = caps[2].parse::<u64>().ok();
        match caps[1].trim() {
            "Pages wired down" => wired = value,
            "Pages occupied by compressor" => compressed = value,
            _ => {}
        }
    }

    if wired.is_none() && compressed.is_none() {
        return None;
    }

    Some(VmStat {
        page_size,
        wired_pages: wired.unwrap_or(0),
        compressed_pages: compressed.unwrap_or(0),
    })
}

#[cfg(target_os = "macos")]
fn read_vm_stat() -> Option<VmStat> {
    let output = std::process::Command::new("vm_stat").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_vm_stat(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_STAT_SAMPLE: &str = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                               12345.
Pages active:                            234567.
Pages inactive:                          223344.
Pages speculative:                         1234.
Pages throttled:                              0.
Pages wired down:                        131072.
Pages purgeable:                           5678.
\"Translation faults\":                  987654321.
Pages copy-on-write:                    1234567.
Pages zero filled:                    123456789.
Pages reactivated:                        45678.
Pages purged:                              6789.
File-backed pages:                        98765.
Anonymous pages:                         345678.
Pages stored in compressor:              200000.
Pages occupied by compressor:             65536.
";

    #[test]
    fn test_parse_vm_stat_reads_wired_and_compressor() {
        let stats = parse_vm_stat(VM_STAT_SAMPLE).unwrap();
        assert_eq!(stats.page_size, 16384);
        assert_eq!(stats.wired_pages, 131072);
        assert_eq!(stats.compressed_pages, 65536);
        assert_eq!(stats.wired_bytes(), 2 * 1024 * 1024 * 1024);
        assert_eq!(stats.compressed_bytes(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_vm_stat_ignores_stored_in_compressor() {
        // "stored in" counts logical pages, only "occupied by" is resident.
        let stats = parse_vm_stat("Pages stored in compressor: 999.\nPages wired down: 1.\n").unwrap();
        assert_eq!(stats.compressed_pages, 0);
        assert_eq!(stats.wired_pages, 1);
    }

    #[test]
    fn test_parse_vm_stat_intel_page_size() {
        let output = "Mach Virtual Memory Statistics: (page size of 4096 bytes)\nPages wired down: 10.\n";
        let stats = parse_vm_stat(output).unwrap();
        assert_eq!(stats.page_size, 4096);
        assert_eq!(stats.wired_bytes(), 40960);
    }

    #[test]
    fn test_parse_vm_stat_defaults_page_size() {
        let stats = parse_vm_stat("Pages occupied by compressor: 2.\n").unwrap();
        assert_eq!(stats.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(stats.compressed_bytes(), 2 * DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_parse_vm_stat_rejects_unrelated_output() {
        assert_eq!(parse_vm_stat(""), None);
        assert_eq!(parse_vm_stat("command not found"), None);
    }

    #[test]
    fn test_system_probe_is_consistent() {
        // Either unavailable or a snapshot whose reserved part fits in total.
        if let Some(snapshot) = SystemMemoryProbe::new().probe() {
            assert!(snapshot.total_bytes > 0);
            assert!(snapshot.wired_bytes <= snapshot.total_bytes);
        }
    }

    #[test]
    fn test_reserved_bytes_saturates() {
        let snapshot = MemorySnapshot::new(10, u64::MAX, 5);
        assert_eq!(snapshot.reserved_bytes(), u64::MAX);
    }
}
