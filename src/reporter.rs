use crate::report::{MemoryUsage, SystemReport};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode report as JSON: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Writes the report as pretty JSON, replacing any existing file.
pub fn write_json(report: &SystemReport, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut bytes = serde_json::to_vec_pretty(report)?;
    bytes.push(b'\n');
    write_file(path.as_ref(), &bytes)
}

/// Writes the flattened text rendering, replacing any existing file.
pub fn write_text(report: &SystemReport, path: impl AsRef<Path>) -> Result<(), ReportError> {
    write_file(path.as_ref(), render_text(report).as_bytes())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    fs::write(path, bytes).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn render_text(report: &SystemReport) -> String {
    let mut out = String::new();

    section(&mut out, "Platform");
    let p = &report.platform;
    line(&mut out, "Hostname", opt(p.host_name.as_deref()));
    line(&mut out, "OS name", opt(p.os_name.as_deref()));
    line(&mut out, "OS release", opt(p.os_release.as_deref()));
    line(&mut out, "OS version", opt(p.os_version.as_deref()));
    line(&mut out, "Distribution", opt(p.long_os_name.as_deref()));
    line(&mut out, "Architecture", &p.architecture);

    section(&mut out, "CPU");
    match &report.cpu {
        Some(cpu) => {
            line(&mut out, "Logical cores", cpu.logical_cores);
            line(&mut out, "Physical cores", opt(cpu.physical_cores));
            line(&mut out, "Brand", opt(cpu.brand.as_deref()));
            line(
                &mut out,
                "Current frequency (MHz)",
                opt(cpu.current_frequency_mhz),
            );
            line(&mut out, "Min frequency (MHz)", opt(cpu.min_frequency_mhz));
            line(&mut out, "Max frequency (MHz)", opt(cpu.max_frequency_mhz));
            line(&mut out, "Usage (%)", format!("{:.1}", cpu.usage_percent));
        }
        None => unavailable(&mut out),
    }

    section(&mut out, "Memory");
    match &report.memory {
        Some(memory) => {
            memory_lines(&mut out, "RAM", &memory.ram);
            memory_lines(&mut out, "Swap", &memory.swap);
        }
        None => unavailable(&mut out),
    }

    section(&mut out, "Disks");
    if report.disks.is_empty() {
        unavailable(&mut out);
    }
    for d in &report.disks {
        let label = format!("{} ({}, {})", d.mount_point, d.file_system, d.device);
        line(
            &mut out,
            &label,
            format!(
                "{} total, {} used, {} free, {:.1}% used",
                human_bytes(d.total_bytes),
                human_bytes(d.used_bytes),
                human_bytes(d.free_bytes),
                d.percent_used
            ),
        );
    }

    section(&mut out, "Network");
    if report.network.interfaces.is_empty() {
        line(&mut out, "Interfaces", UNAVAILABLE);
    }
    for (iface, addrs) in &report.network.interfaces {
        let joined = addrs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        line(&mut out, iface, joined);
    }
    line(
        &mut out,
        "Primary local IP",
        opt(report.network.primary_local_ip),
    );
    line(&mut out, "Public IP", opt(report.network.public_ip));

    section(&mut out, "Timestamp");
    line(&mut out, "Captured at (UTC)", &report.timestamp);

    section(&mut out, "Version");
    line(&mut out, "sysdumper", &report.tool_version);

    out
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "[{title}]");
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{label}: {value}");
}

fn unavailable(out: &mut String) {
    let _ = writeln!(out, "{UNAVAILABLE}");
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

fn memory_lines(out: &mut String, label: &str, usage: &MemoryUsage) {
    line(out, &format!("{label} total"), human_bytes(usage.total_bytes));
    line(
        out,
        &format!("{label} available"),
        human_bytes(usage.available_bytes),
    );
    line(out, &format!("{label} used"), human_bytes(usage.used_bytes));
    line(
        out,
        &format!("{label} used (%)"),
        format!("{:.1}", usage.percent_used),
    );
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {} ({bytes} bytes)", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CpuStats, DiskStat, MemoryStats, NetworkInfo, PlatformInfo};
    use std::collections::BTreeMap;
    use std::net::{IpAddr, Ipv4Addr};

    const GIB: u64 = 1024 * 1024 * 1024;

    fn full_report() -> SystemReport {
        let mut interfaces = BTreeMap::new();
        interfaces.insert(
            "eth0".to_string(),
            vec![
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
                "fe80::1".parse().unwrap(),
            ],
        );
        SystemReport {
            platform: PlatformInfo {
                host_name: Some("testhost".to_string()),
                os_name: Some("Linux".to_string()),
                os_release: Some("6.1.0".to_string()),
                os_version: Some("12".to_string()),
                long_os_name: Some("Linux 12 (bookworm)".to_string()),
                architecture: "x86_64".to_string(),
            },
            cpu: Some(CpuStats {
                logical_cores: 8,
                physical_cores: Some(4),
                brand: Some("Test CPU".to_string()),
                current_frequency_mhz: Some(2400),
                min_frequency_mhz: Some(800),
                max_frequency_mhz: Some(3600),
                usage_percent: 12.5,
            }),
            memory: Some(MemoryStats {
                ram: MemoryUsage::new(16 * GIB, 12 * GIB, 4 * GIB),
                swap: MemoryUsage::new(0, 0, 0),
            }),
            disks: vec![DiskStat {
                device: "/dev/sda1".to_string(),
                mount_point: "/".to_string(),
                file_system: "ext4".to_string(),
                total_bytes: 1000,
                used_bytes: 750,
                free_bytes: 250,
                percent_used: 75.0,
            }],
            network: NetworkInfo {
                interfaces,
                primary_local_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10))),
                public_ip: Some(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))),
            },
            timestamp: "2026-10-16T12:00:00Z".to_string(),
            tool_version: "0.1.0".to_string(),
        }
    }

    fn degraded_report() -> SystemReport {
        SystemReport {
            cpu: None,
            memory: None,
            disks: Vec::new(),
            network: NetworkInfo::default(),
            ..full_report()
        }
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("system_info.json");
        for report in [full_report(), degraded_report()] {
            write_json(&report, &path).expect("write json");
            let text = fs::read_to_string(&path).expect("read back");
            let parsed: SystemReport = serde_json::from_str(&text).expect("parse back");
            assert_eq!(parsed, report);
        }
    }

    #[test]
    fn json_keys_follow_field_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("system_info.json");
        write_json(&full_report(), &path).expect("write json");
        let text = fs::read_to_string(&path).expect("read back");

        let keys = [
            "\"platform\"",
            "\"cpu\"",
            "\"memory\"",
            "\"disks\"",
            "\"network\"",
            "\"timestamp\"",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| text.find(k).unwrap_or_else(|| panic!("missing key {k}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn json_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("system_info.json");
        fs::write(&path, "x".repeat(100_000)).expect("seed file");
        write_json(&degraded_report(), &path).expect("write json");
        let text = fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with('{'));
        assert!(!text.contains("xxxx"));
    }

    #[test]
    fn text_labels_every_top_level_field() {
        let text = render_text(&full_report());
        for header in [
            "[Platform]",
            "[CPU]",
            "[Memory]",
            "[Disks]",
            "[Network]",
            "[Timestamp]",
            "[Version]",
        ] {
            assert!(text.contains(header), "missing {header}");
        }
        assert!(text.contains("sysdumper: 0.1.0"));
        assert!(text.contains("Hostname: testhost"));
        assert!(text.contains("Usage (%): 12.5"));
        assert!(text.contains("RAM total: 16.00 GiB (17179869184 bytes)"));
        assert!(text.contains(
            "/ (ext4, /dev/sda1): 1000 B total, 750 B used, 250 B free, 75.0% used"
        ));
        assert!(text.contains("eth0: 192.168.1.10, fe80::1"));
        assert!(text.contains("Public IP: 203.0.113.7"));
        assert!(text.contains("Primary local IP: 192.168.1.10"));
        assert!(text.contains("Min frequency (MHz): 800"));
        assert!(text.contains("Swap used (%): 0.0"));
    }

    #[test]
    fn text_marks_absent_fields_unavailable() {
        let text = render_text(&degraded_report());
        assert!(text.contains("[CPU]\nunavailable\n"));
        assert!(text.contains("[Memory]\nunavailable\n"));
        assert!(text.contains("[Disks]\nunavailable\n"));
        assert!(text.contains("Interfaces: unavailable"));
        assert!(text.contains("Public IP: unavailable"));
        assert!(text.contains("Primary local IP: unavailable"));
    }

    #[test]
    fn unwritable_json_path_fails_while_text_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json_path = dir.path().join("missing").join("system_info.json");
        let text_path = dir.path().join("system_info.txt");
        let report = full_report();

        let err = write_json(&report, &json_path).expect_err("json write must fail");
        assert!(matches!(err, ReportError::Write { .. }));
        assert!(err.to_string().contains("system_info.json"));

        write_text(&report, &text_path).expect("text write is independent");
        let text = fs::read_to_string(&text_path).expect("read back");
        assert_eq!(text, render_text(&report));
    }

    #[test]
    fn human_bytes_picks_unit() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1536), "1.50 KiB (1536 bytes)");
        assert_eq!(human_bytes(1024 * 1024), "1.00 MiB (1048576 bytes)");
    }
}
