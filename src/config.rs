use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level TOML configuration.
///
/// Everything but the tracker list has a default, so a minimal file only
/// names the devices to relay.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Seconds to sleep between full polling rounds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Append-mode log file, written in addition to stdout.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_mapshare_base_url")]
    pub mapshare_base_url: String,
    #[serde(default = "default_caltopo_base_url")]
    pub caltopo_base_url: String,
    #[serde(default)]
    pub trackers: Vec<TrackerConfig>,
}

/// One tracked device.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// CalTopo group the position reports are addressed to.
    pub group: String,
    /// Device identifier within the group.
    pub device_id: String,
    /// Label used in log lines only.
    pub display_name: String,
    /// Garmin MapShare share code for the upstream feed.
    pub mapshare_code: String,
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config: RelayConfig =
            toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))?;
        Ok(config)
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_log_file() -> PathBuf {
    PathBuf::from("mapshare-relay.log")
}

fn default_mapshare_base_url() -> String {
    "https://inreach.garmin.com".to_string()
}

fn default_caltopo_base_url() -> String {
    "https://caltopo.com".to_string()
}
