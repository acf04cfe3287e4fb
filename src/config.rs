use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{PacError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Candidate proxy endpoints; the first one is the default.
    pub proxy_servers: Vec<String>,
    pub backup_dir: PathBuf,
    /// IANA zone used for timestamps.
    pub timezone: String,
    pub domain_increment: i64,
    pub auto_backup: bool,
    /// Abort an update when its backup cannot be written.
    pub strict_backup: bool,
    /// PAC files the tester reads its domain table from.
    pub pac_files: Vec<PathBuf>,
    /// Files updated when none are given on the command line.
    pub default_targets: Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_servers: vec![
                "162.159.138.110:443".into(),
                "172.67.243.247:443".into(),
                "2402:d0c0:0:2e8::11:25".into(),
            ],
            backup_dir: PathBuf::from("backups"),
            timezone: "Asia/Shanghai".into(),
            domain_increment: 1,
            auto_backup: true,
            strict_backup: false,
            pac_files: vec![PathBuf::from("pac"), PathBuf::from("pac5")],
            default_targets: vec![PathBuf::from("pac"), PathBuf::from("pac5"), PathBuf::from("README.md")],
        }
    }
}

impl AppConfig {
    /// Loads the configuration file, falling back to defaults on any failure.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            warn!("Config file {} not found. Using defaults.", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// JSON files are read with serde_json, everything else through confy (TOML).
    pub fn read(path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str(&raw).map_err(|e| PacError::Config(format!("{}: {}", path.display(), e)))
        } else {
            confy::load_path(path).map_err(|e| PacError::Config(format!("{}: {}", path.display(), e)))
        }
    }

    pub fn default_proxy(&self) -> Option<&str> {
        self.proxy_servers.first().map(String::as_str)
    }
}
