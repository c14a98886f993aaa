//! Configuration file support for wifi-scan-parser.
//!
//! Loads settings from `~/.config/wifi-scan-parser/config.toml` on Linux
//! (or platform-appropriate location on other OSes).

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::heatmap::{DEFAULT_CELL_SIZE, MAX_CELL_SIZE};
use crate::network::ScanFormat;
use crate::scanner::{DEFAULT_INTERFACE, ScannerConfig};

/// Which report format to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatChoice {
    /// Follow the host platform.
    #[default]
    Auto,
    Netsh,
    Iwlist,
}

impl FormatChoice {
    /// Resolve to a concrete format.
    pub fn resolve(self) -> ScanFormat {
        match self {
            FormatChoice::Auto => ScanFormat::for_host(),
            FormatChoice::Netsh => ScanFormat::Netsh,
            FormatChoice::Iwlist => ScanFormat::Iwlist,
        }
    }
}

/// Heatmap rendering settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Edge length of one cell in pixels.
    pub cell_size: u32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wireless interface scanned by iwlist.
    pub interface: String,

    /// Report format to expect.
    pub format: FormatChoice,

    /// Scan timeout in seconds.
    pub scan_timeout: u64,

    /// Directory receiving CSV and heatmap files.
    pub output_dir: PathBuf,

    /// Label for where the scan was taken.
    pub location_name: String,

    /// Write a CSV file of the records.
    pub write_csv: bool,

    /// Render a heatmap of the records.
    pub write_heatmap: bool,

    /// Heatmap rendering settings.
    pub heatmap: HeatmapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            format: FormatChoice::Auto,
            scan_timeout: 30,
            output_dir: PathBuf::from("."),
            location_name: "current_location".to_string(),
            write_csv: true,
            write_heatmap: true,
            heatmap: HeatmapConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
            }
            _ => Ok(Config::default()),
        }
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wifi-scan-parser/config.toml"))
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        if self.interface.trim().is_empty() {
            bail!("interface must not be empty");
        }
        if self.scan_timeout == 0 {
            bail!("scan_timeout must be at least 1 second");
        }
        if self.heatmap.cell_size == 0 {
            bail!("heatmap.cell_size must be at least 1 pixel");
        }
        if self.heatmap.cell_size > MAX_CELL_SIZE {
            bail!("heatmap.cell_size must be at most {} pixels", MAX_CELL_SIZE);
        }
        Ok(())
    }

    /// Scanner settings derived from this configuration.
    pub fn scanner(&self) -> ScannerConfig {
        ScannerConfig::with_interface(self.interface.clone())
            .with_timeout(Duration::from_secs(self.scan_timeout))
    }
}
