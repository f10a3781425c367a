use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Everything captured during one invocation. Field order here is the key
/// order of the JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemReport {
    pub platform: PlatformInfo,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub disks: Vec<DiskStat>,
    pub network: NetworkInfo,
    pub timestamp: String,
    pub tool_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub host_name: Option<String>,
    pub os_name: Option<String>,
    pub os_release: Option<String>,
    pub os_version: Option<String>,
    pub long_os_name: Option<String>,
    pub architecture: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    pub logical_cores: usize,
    pub physical_cores: Option<usize>,
    pub brand: Option<String>,
    pub current_frequency_mhz: Option<u64>,
    pub min_frequency_mhz: Option<u64>,
    pub max_frequency_mhz: Option<u64>,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub ram: MemoryUsage,
    pub swap: MemoryUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub percent_used: f64,
}

impl MemoryUsage {
    pub fn new(total_bytes: u64, available_bytes: u64, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            available_bytes,
            used_bytes,
            percent_used: percent(used_bytes, total_bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStat {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent_used: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub interfaces: BTreeMap<String, Vec<IpAddr>>,
    /// Address the hostname resolves to.
    pub primary_local_ip: Option<IpAddr>,
    pub public_ip: Option<IpAddr>,
}

/// Share of `part` in `total` as 0..100, rounded to one decimal. Zero when
/// `total` is zero.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = (part as f64 / total as f64) * 100.0;
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}
