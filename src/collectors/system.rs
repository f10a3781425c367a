use crate::collectors::{HostProbe, NetInterface, Partition, PartitionUsage, ProbeError};
use crate::report::{CpuStats, MemoryStats, MemoryUsage, PlatformInfo};
#[cfg(target_os = "linux")]
use std::fs;
use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;
use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::debug;

#[cfg(target_os = "linux")]
const CPU_MIN_FREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_min_freq";
#[cfg(target_os = "linux")]
const CPU_MAX_FREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq";

/// `HostProbe` backed by the sysinfo crate.
pub struct SysinfoProbe {
    system: System,
    disks: Disks,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            disks: Disks::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostProbe for SysinfoProbe {
    fn platform(&mut self) -> PlatformInfo {
        PlatformInfo {
            host_name: non_empty(System::host_name()),
            os_name: non_empty(System::name()),
            os_release: non_empty(System::kernel_version()),
            os_version: non_empty(System::os_version()),
            long_os_name: non_empty(System::long_os_version()),
            architecture: std::env::consts::ARCH.to_string(),
        }
    }

    fn min_cpu_sample_interval(&self) -> Duration {
        MINIMUM_CPU_UPDATE_INTERVAL
    }

    fn begin_cpu_sample(&mut self) {
        self.system.refresh_cpu_all();
    }

    fn cpu(&mut self) -> Result<CpuStats, ProbeError> {
        self.system.refresh_cpu_all();
        let cpus = self.system.cpus();
        let Some(first) = cpus.first() else {
            return Err(ProbeError::Unavailable("cpu list"));
        };

        let usage = self.system.global_cpu_usage() as f64;
        let brand = first.brand().trim();

        Ok(CpuStats {
            logical_cores: cpus.len(),
            physical_cores: self.system.physical_core_count(),
            brand: (!brand.is_empty()).then(|| brand.to_string()),
            current_frequency_mhz: Some(first.frequency()).filter(|f| *f > 0),
            min_frequency_mhz: read_cpufreq_mhz(CpuFreqBound::Min),
            max_frequency_mhz: read_cpufreq_mhz(CpuFreqBound::Max),
            usage_percent: (usage.clamp(0.0, 100.0) * 10.0).round() / 10.0,
        })
    }

    fn memory(&mut self) -> Result<MemoryStats, ProbeError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(ProbeError::Unavailable("memory totals"));
        }

        Ok(MemoryStats {
            ram: MemoryUsage::new(
                total,
                self.system.available_memory(),
                self.system.used_memory(),
            ),
            swap: MemoryUsage::new(
                self.system.total_swap(),
                self.system.free_swap(),
                self.system.used_swap(),
            ),
        })
    }

    fn partitions(&mut self) -> Result<Vec<Partition>, ProbeError> {
        self.disks = Disks::new_with_refreshed_list();
        let partitions: Vec<Partition> = self
            .disks
            .list()
            .iter()
            .map(|d| Partition {
                device: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_string_lossy().into_owned(),
                file_system: d.file_system().to_string_lossy().into_owned(),
            })
            .collect();
        debug!(count = partitions.len(), "partitions enumerated");
        Ok(partitions)
    }

    fn partition_usage(&mut self, partition: &Partition) -> Result<PartitionUsage, ProbeError> {
        let disk = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point().to_string_lossy() == partition.mount_point)
            .ok_or_else(|| ProbeError::Vanished(partition.mount_point.clone()))?;

        let total = disk.total_space();
        if total == 0 {
            return Err(ProbeError::Unreadable {
                target: partition.mount_point.clone(),
                reason: "no capacity reported".to_string(),
            });
        }

        Ok(PartitionUsage {
            total_bytes: total,
            free_bytes: disk.available_space().min(total),
        })
    }

    fn interfaces(&mut self) -> Result<Vec<NetInterface>, ProbeError> {
        let networks = Networks::new_with_refreshed_list();
        let mut interfaces: Vec<NetInterface> = networks
            .iter()
            .map(|(name, data)| NetInterface {
                name: name.to_string(),
                addresses: data.ip_networks().iter().map(|n| n.addr).collect(),
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(interfaces)
    }

    fn primary_local_ip(&mut self) -> Result<IpAddr, ProbeError> {
        let host = non_empty(System::host_name()).ok_or(ProbeError::Unavailable("hostname"))?;
        let addrs: Vec<IpAddr> = (host.as_str(), 0)
            .to_socket_addrs()
            .map_err(|err| ProbeError::Unreadable {
                target: host.clone(),
                reason: err.to_string(),
            })?
            .map(|a| a.ip())
            .collect();
        pick_primary(&addrs).ok_or(ProbeError::Unavailable("hostname address"))
    }
}

/// First IPv4 address wins, mirroring classic hostname lookups.
fn pick_primary(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

#[derive(Debug, Clone, Copy)]
enum CpuFreqBound {
    Min,
    Max,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(target_os = "linux")]
fn read_cpufreq_mhz(bound: CpuFreqBound) -> Option<u64> {
    let path = match bound {
        CpuFreqBound::Min => CPU_MIN_FREQ_PATH,
        CpuFreqBound::Max => CPU_MAX_FREQ_PATH,
    };
    let raw = fs::read_to_string(path).ok()?;
    parse_khz_as_mhz(&raw)
}

#[cfg(not(target_os = "linux"))]
fn read_cpufreq_mhz(_bound: CpuFreqBound) -> Option<u64> {
    None
}

/// cpufreq reports kHz.
#[cfg(any(target_os = "linux", test))]
fn parse_khz_as_mhz(raw: &str) -> Option<u64> {
    let khz = raw.trim().parse::<u64>().ok()?;
    (khz > 0).then_some(khz / 1000)
}
