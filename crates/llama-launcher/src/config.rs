// llama-launcher/src/config.rs

use crate::advisor::DEFAULT_MIB_PER_TOKEN;
use crate::config_store::DEFAULT_CONFIG_FILE_NAME;
use crate::error::{LaunchError, Result};
use crate::memory::{DEFAULT_OVERHEAD_MARGIN_BYTES, GIB};
use crate::utils::expand_home;
use directories::BaseDirs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BINARY: &str = "llama-server";

/// Defaults offered at each parameter prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchDefaults {
    pub ctx_size: i64,
    pub n_predict: i64,
    pub gpu_layers: u32,
    pub batch_size: u32,
    pub ubatch_size: u32,
    pub port: u16,
    pub parallel_slots: u32,
    pub flash_attn: bool,
    pub jinja: bool,
}

impl Default for LaunchDefaults {
    fn default() -> Self {
        Self {
            ctx_size: 32768,
            n_predict: 8192,
            gpu_layers: 99,
            batch_size: 2048,
            ubatch_size: 1024,
            port: 8080,
            parallel_slots: 1,
            flash_attn: false,
            jinja: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub binary: String,
    pub config_path: PathBuf,
    pub overhead_margin_bytes: u64,
    pub mib_per_token: f64,
    pub port_probe_timeout: Duration,
    pub dry_run: bool,
    pub defaults: LaunchDefaults,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            config_path: default_config_path(),
            overhead_margin_bytes: DEFAULT_OVERHEAD_MARGIN_BYTES,
            mib_per_token: DEFAULT_MIB_PER_TOKEN,
            port_probe_timeout: Duration::from_millis(500),
            dry_run: false,
            defaults: LaunchDefaults::default(),
        }
    }
}

impl LauncherConfig {
    /// Defaults overridden by `LLAMA_BIN`, `LLAMA_LAUNCHER_CONFIG`,
    /// `LLAMA_LAUNCHER_OVERHEAD_GIB` and `LLAMA_LAUNCHER_MIB_PER_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(bin) = lookup("LLAMA_BIN").filter(|v| !v.trim().is_empty()) {
            cfg.binary = bin.trim().to_string();
        }
        if let Some(path) = lookup("LLAMA_LAUNCHER_CONFIG").filter(|v| !v.trim().is_empty()) {
            cfg.config_path = expand_home(path.trim());
        }
        if let Some(raw) = lookup("LLAMA_LAUNCHER_OVERHEAD_GIB") {
            cfg.overhead_margin_bytes = gib_to_bytes(parse_non_negative(&raw, "overhead margin in GiB")?);
        }
        if let Some(raw) = lookup("LLAMA_LAUNCHER_MIB_PER_TOKEN") {
            cfg.mib_per_token = parse_non_negative(&raw, "MiB-per-token coefficient")?;
        }

        Ok(cfg)
    }

    pub fn print_config(&self) {
        info!("Current Configuration:");
        info!("- Binary: {}", self.binary);
        info!("- Config File: {}", self.config_path.display());
        info!("- Overhead Margin: {} bytes", self.overhead_margin_bytes);
        info!("- Context Cost: {} MiB/token", self.mib_per_token);
        info!("- Port Probe Timeout: {:?}", self.port_probe_timeout);
        info!("- Dry Run: {}", self.dry_run);
    }
}

/// `~/.llama_cli_config`, or the bare file name when no home directory is known.
pub fn default_config_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_NAME))
}

pub fn gib_to_bytes(gib: f64) -> u64 {
    (gib * GIB as f64).round() as u64
}

pub fn parse_non_negative(raw: &str, expected: &'static str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(finite_non_negative)
        .ok_or_else(|| LaunchError::Parse {
            input: raw.trim().to_string(),
            expected,
        })
}

/// Accepts zero; rejects negatives, NaN and infinity.
pub fn check_non_negative(value: f64, expected: &'static str) -> Result<f64> {
    finite_non_negative(value).ok_or_else(|| LaunchError::Parse {
        input: value.to_string(),
        expected,
    })
}

fn finite_non_negative(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_server_defaults() {
        let d = LaunchDefaults::default();
        assert_eq!(d.ctx_size, 32768);
        assert_eq!(d.n_predict, 8192);
        assert_eq!(d.gpu_layers, 99);
        assert_eq!(d.batch_size, 2048);
        assert_eq!(d.ubatch_size, 1024);
        assert_eq!(d.port, 8080);
        assert_eq!(d.parallel_slots, 1);
        assert!(!d.flash_attn);
        assert!(d.jinja);
    }

    #[test]
    fn test_from_lookup_without_env_uses_defaults() {
        let cfg = LauncherConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.binary, DEFAULT_BINARY);
        assert_eq!(cfg.overhead_margin_bytes, 2 * GIB);
        assert_eq!(cfg.mib_per_token, 0.25);
        assert!(cfg.config_path.ends_with(DEFAULT_CONFIG_FILE_NAME));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let cfg = LauncherConfig::from_lookup(lookup_from(&[
            ("LLAMA_BIN", "/opt/llama/bin/llama-server"),
            ("LLAMA_LAUNCHER_CONFIG", "/etc/llama.conf"),
            ("LLAMA_LAUNCHER_OVERHEAD_GIB", "4"),
            ("LLAMA_LAUNCHER_MIB_PER_TOKEN", "0.5"),
        ]))
        .unwrap();
        assert_eq!(cfg.binary, "/opt/llama/bin/llama-server");
        assert_eq!(cfg.config_path, PathBuf::from("/etc/llama.conf"));
        assert_eq!(cfg.overhead_margin_bytes, 4 * GIB);
        assert_eq!(cfg.mib_per_token, 0.5);
    }

    #[test]
    fn test_from_lookup_blank_binary_ignored() {
        let cfg = LauncherConfig::from_lookup(lookup_from(&[("LLAMA_BIN", "  ")])).unwrap();
        assert_eq!(cfg.binary, DEFAULT_BINARY);
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = LauncherConfig::from_lookup(lookup_from(&[("LLAMA_LAUNCHER_OVERHEAD_GIB", "-1")]))
            .unwrap_err();
        assert!(matches!(err, LaunchError::Parse { .. }));
        assert!(LauncherConfig::from_lookup(lookup_from(&[("LLAMA_LAUNCHER_MIB_PER_TOKEN", "abc")])).is_err());
    }

    #[test]
    fn test_non_negative_checks() {
        assert_eq!(parse_non_negative(" 0 ", "margin").unwrap(), 0.0);
        assert_eq!(check_non_negative(1.5, "margin").unwrap(), 1.5);
        assert!(check_non_negative(-0.5, "margin").is_err());
        assert!(check_non_negative(f64::NAN, "margin").is_err());
        assert!(check_non_negative(f64::INFINITY, "margin").is_err());
        assert!(parse_non_negative("inf", "margin").is_err());
    }

    #[test]
    fn test_gib_to_bytes_fractional() {
        assert_eq!(gib_to_bytes(1.5), GIB + GIB / 2);
        assert_eq!(gib_to_bytes(0.0), 0);
    }
}
