use crate::collectors::CollectOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const MAX_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub public_ip: PublicIpConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_json_path")]
    pub json_path: PathBuf,
    #[serde(default = "default_text_path")]
    pub text_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectConfig {
    #[serde(default)]
    pub include_public_ip: bool,
    #[serde(default = "default_cpu_sample_interval_ms")]
    pub cpu_sample_interval_ms: u64,
    #[serde(default)]
    pub include_loopback: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicIpConfig {
    #[serde(default = "default_public_ip_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_public_ip_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            text_path: default_text_path(),
        }
    }
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            include_public_ip: false,
            cpu_sample_interval_ms: default_cpu_sample_interval_ms(),
            include_loopback: false,
        }
    }
}

impl Default for PublicIpConfig {
    fn default() -> Self {
        Self {
            endpoint: default_public_ip_endpoint(),
            timeout_ms: default_public_ip_timeout_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Parses the file without validating it; callers validate once all
    /// overrides are applied.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_output(&self.output)?;
        validate_collect(&self.collect)?;
        validate_public_ip(&self.public_ip)?;
        Ok(())
    }

    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            include_public_ip: self.collect.include_public_ip,
            cpu_sample_interval: Duration::from_millis(self.collect.cpu_sample_interval_ms),
            include_loopback: self.collect.include_loopback,
        }
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_output(cfg: &OutputConfig) -> Result<(), ConfigError> {
    if cfg.json_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output.json_path must not be empty".to_string(),
        ));
    }
    if cfg.text_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output.text_path must not be empty".to_string(),
        ));
    }
    if cfg.json_path == cfg.text_path {
        return Err(ConfigError::Validation(format!(
            "output.json_path and output.text_path both point to '{}'",
            cfg.json_path.display()
        )));
    }
    Ok(())
}

fn validate_collect(cfg: &CollectConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_INTERVAL_MS).contains(&cfg.cpu_sample_interval_ms) {
        return Err(ConfigError::Validation(format!(
            "collect.cpu_sample_interval_ms must be in 1..={MAX_INTERVAL_MS}"
        )));
    }
    Ok(())
}

fn validate_public_ip(cfg: &PublicIpConfig) -> Result<(), ConfigError> {
    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Validation(
            "public_ip.endpoint must not be empty".to_string(),
        ));
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "public_ip.endpoint '{endpoint}' must be an http:// or https:// URL"
        )));
    }
    if !(1..=MAX_INTERVAL_MS).contains(&cfg.timeout_ms) {
        return Err(ConfigError::Validation(format!(
            "public_ip.timeout_ms must be in 1..={MAX_INTERVAL_MS}"
        )));
    }
    Ok(())
}

fn default_json_path() -> PathBuf {
    PathBuf::from("system_info.json")
}

fn default_text_path() -> PathBuf {
    PathBuf::from("system_info.txt")
}

const fn default_cpu_sample_interval_ms() -> u64 {
    1000
}

fn default_public_ip_endpoint() -> String {
    "https://api.ipify.org".to_string()
}

const fn default_public_ip_timeout_ms() -> u64 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default()
            .validate()
            .expect("defaults must pass validation");
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config =
            serde_yaml::from_str(Config::example_yaml()).expect("example config must parse");
        cfg.validate().expect("example config must be valid");
        assert!(!cfg.collect.include_public_ip);
        assert_eq!(cfg.public_ip.timeout_ms, 3000);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("collect:\n  include_public_ip: true\n")
            .expect("partial config must parse");
        assert!(cfg.collect.include_public_ip);
        assert_eq!(cfg.collect.cpu_sample_interval_ms, 1000);
        assert_eq!(cfg.output.json_path, PathBuf::from("system_info.json"));
        assert_eq!(cfg.public_ip.endpoint, "https://api.ipify.org");
    }

    #[test]
    fn read_from_file_leaves_validation_to_caller() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sysdumper.yaml");
        fs::write(&path, "public_ip:\n  timeout_ms: 0\n").expect("write config");

        let cfg = Config::read_from_file(&path).expect("parses despite invalid value");
        assert_eq!(cfg.public_ip.timeout_ms, 0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_identical_output_paths() {
        let mut cfg = Config::default();
        cfg.output.text_path = cfg.output.json_path.clone();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_timeout_and_interval() {
        let mut cfg = Config::default();
        cfg.public_ip.timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.collect.cpu_sample_interval_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let mut cfg = Config::default();
        cfg.public_ip.endpoint = "ftp://example.com".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn collect_options_carry_interval() {
        let mut cfg = Config::default();
        cfg.collect.cpu_sample_interval_ms = 250;
        cfg.collect.include_public_ip = true;
        let opts = cfg.collect_options();
        assert_eq!(opts.cpu_sample_interval, Duration::from_millis(250));
        assert!(opts.include_public_ip);
        assert!(!opts.include_loopback);
    }

    #[test]
    fn read_from_missing_file_reports_path() {
        let err = Config::read_from_file("/nonexistent/sysdumper.yaml")
            .expect_err("missing file must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/sysdumper.yaml"));
    }
}
