pub mod public_ip;
pub mod system;

use crate::report::{
    percent, CpuStats, DiskStat, MemoryStats, NetworkInfo, PlatformInfo, SystemReport,
};
use public_ip::PublicIpFetcher;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub include_public_ip: bool,
    pub cpu_sample_interval: Duration,
    pub include_loopback: bool,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0} not reported by the host")]
    Unavailable(&'static str),
    #[error("cannot read {target}: {reason}")]
    Unreadable { target: String, reason: String },
    #[error("{0} disappeared during collection")]
    Vanished(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
    pub file_system: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionUsage {
    pub total_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub name: String,
    pub addresses: Vec<IpAddr>,
}

/// Host metrics provider. Every fallible query is independent: an error only
/// costs the field it feeds.
pub trait HostProbe {
    fn platform(&mut self) -> PlatformInfo;

    /// Shortest window over which the provider can measure CPU usage.
    fn min_cpu_sample_interval(&self) -> Duration {
        Duration::ZERO
    }

    fn begin_cpu_sample(&mut self);
    fn cpu(&mut self) -> Result<CpuStats, ProbeError>;
    fn memory(&mut self) -> Result<MemoryStats, ProbeError>;
    fn partitions(&mut self) -> Result<Vec<Partition>, ProbeError>;
    fn partition_usage(&mut self, partition: &Partition) -> Result<PartitionUsage, ProbeError>;
    fn interfaces(&mut self) -> Result<Vec<NetInterface>, ProbeError>;
    fn primary_local_ip(&mut self) -> Result<IpAddr, ProbeError>;
}

pub struct Collector<P, F> {
    probe: P,
    public_ip: F,
}

impl<P: HostProbe, F: PublicIpFetcher> Collector<P, F> {
    pub fn new(probe: P, public_ip: F) -> Self {
        Self { probe, public_ip }
    }

    /// Runs one collection pass. Never fails: sub-query errors are logged and
    /// leave their field empty.
    pub async fn collect(&mut self, options: &CollectOptions) -> SystemReport {
        let timestamp = humantime::format_rfc3339_seconds(SystemTime::now()).to_string();
        let platform = self.probe.platform();
        let cpu = self.collect_cpu(options.cpu_sample_interval).await;

        let memory = match self.probe.memory() {
            Ok(memory) => Some(memory),
            Err(err) => {
                warn!(error = %err, "memory query failed");
                None
            }
        };

        let disks = self.collect_disks();
        let interfaces = self.collect_interfaces(options.include_loopback);
        let primary_local_ip = match self.probe.primary_local_ip() {
            Ok(ip) => Some(ip),
            Err(err) => {
                warn!(error = %err, "hostname resolution failed");
                None
            }
        };

        let public_ip = if options.include_public_ip {
            self.public_ip.fetch_public_ip().await
        } else {
            None
        };

        debug!(
            cpu = cpu.is_some(),
            memory = memory.is_some(),
            disks = disks.len(),
            interfaces = interfaces.len(),
            public_ip = public_ip.is_some(),
            "collection finished"
        );

        SystemReport {
            platform,
            cpu,
            memory,
            disks,
            network: NetworkInfo {
                interfaces,
                primary_local_ip,
                public_ip,
            },
            timestamp,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn collect_cpu(&mut self, interval: Duration) -> Option<CpuStats> {
        self.probe.begin_cpu_sample();
        let wait = interval.max(self.probe.min_cpu_sample_interval());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        match self.probe.cpu() {
            Ok(cpu) => Some(cpu),
            Err(err) => {
                warn!(error = %err, "cpu query failed");
                None
            }
        }
    }

    fn collect_disks(&mut self) -> Vec<DiskStat> {
        let partitions = match self.probe.partitions() {
            Ok(partitions) => partitions,
            Err(err) => {
                warn!(error = %err, "partition enumeration failed");
                return Vec::new();
            }
        };

        let mut disks = Vec::with_capacity(partitions.len());
        for partition in partitions {
            match self.probe.partition_usage(&partition) {
                Ok(usage) => {
                    let used = usage.total_bytes.saturating_sub(usage.free_bytes);
                    disks.push(DiskStat {
                        device: partition.device,
                        mount_point: partition.mount_point,
                        file_system: partition.file_system,
                        total_bytes: usage.total_bytes,
                        used_bytes: used,
                        free_bytes: usage.free_bytes,
                        percent_used: percent(used, usage.total_bytes),
                    });
                }
                Err(err) => {
                    warn!(mount = %partition.mount_point, error = %err, "skipping partition");
                }
            }
        }
        disks
    }

    fn collect_interfaces(&mut self, include_loopback: bool) -> BTreeMap<String, Vec<IpAddr>> {
        let interfaces = match self.probe.interfaces() {
            Ok(interfaces) => interfaces,
            Err(err) => {
                warn!(error = %err, "network interface query failed");
                return BTreeMap::new();
            }
        };

        let mut out: BTreeMap<String, Vec<IpAddr>> = BTreeMap::new();
        for iface in interfaces {
            let addresses: Vec<IpAddr> = iface
                .addresses
                .into_iter()
                .filter(|addr| include_loopback || !addr.is_loopback())
                .collect();
            if addresses.is_empty() {
                continue;
            }
            let entry = out.entry(iface.name).or_default();
            for addr in addresses {
                if !entry.contains(&addr) {
                    entry.push(addr);
                }
            }
        }
        out
    }
}
