//! Invocation of the operating system's Wi-Fi scan utility.
//!
//! This module runs `netsh` or `iwlist` as a subprocess, guarded by a
//! timeout, and hands the captured report to the parser. Failing to obtain
//! a report is never fatal: the caller just gets no records.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::network::{NetworkRecord, ScanFormat};
use crate::parser::parse_with;
use crate::stats::ScanStats;

/// Default wireless interface for iwlist.
pub const DEFAULT_INTERFACE: &str = "wlan0";

/// Default time allowed for a scan to complete.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// The scan report could not be obtained.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    NonZeroExit { program: String, status: String },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Configuration for the scan runner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Wireless interface passed to iwlist.
    pub interface: String,

    /// Time allowed for the scan utility to finish.
    pub timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl ScannerConfig {
    /// Create a new configuration for the given interface.
    pub fn with_interface(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    /// Set the scan timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ScanCommand {
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The scan utility that produces reports in `format`.
    pub fn for_format(format: ScanFormat, config: &ScannerConfig) -> Self {
        match format {
            ScanFormat::Netsh => Self::new("netsh", ["wlan", "show", "networks", "mode=Bssid"]),
            ScanFormat::Iwlist => Self::new("iwlist", [config.interface.as_str(), "scan"]),
        }
    }
}

/// Run `command` and return its standard output.
///
/// Standard error is discarded. The child is killed if it outlives `limit`.
/// Bytes that are not valid UTF-8 are replaced with U+FFFD so one oddly
/// encoded network name cannot cost the rest of the report.
pub async fn run_command(command: &ScanCommand, limit: Duration) -> Result<String, ScanError> {
    debug!("Running {} {}", command.program, command.args.join(" "));

    let child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ScanError::Spawn {
            program: command.program.clone(),
            source,
        })?;

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| ScanError::Timeout {
            program: command.program.clone(),
            timeout: limit,
        })?
        .map_err(|source| ScanError::Spawn {
            program: command.program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ScanError::NonZeroExit {
            program: command.program.clone(),
            status: output.status.to_string(),
        });
    }

    let report = match String::from_utf8(output.stdout) {
        Ok(report) => report,
        Err(e) => {
            debug!(
                "{} output is not valid UTF-8 at byte {}, decoding lossily",
                command.program,
                e.utf8_error().valid_up_to()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(report)
}

/// Run the scan utility for `format` and return its raw report.
pub async fn run_scan(format: ScanFormat, config: &ScannerConfig) -> Result<String, ScanError> {
    let command = ScanCommand::for_format(format, config);
    info!("Scanning with {}...", command.program);
    run_command(&command, config.timeout).await
}

/// Scan and parse in one step.
///
/// A scan that cannot be run yields an empty vector after logging a
/// warning.
pub async fn scan_networks(
    format: ScanFormat,
    config: &ScannerConfig,
    stats: &ScanStats,
) -> Vec<NetworkRecord> {
    match run_scan(format, config).await {
        Ok(report) => parse_with(&report, format, stats, chrono::Local::now),
        Err(e) => {
            warn!("{}", e);
            warn!("Unable to scan networks. Make sure you have necessary permissions.");
            Vec::new()
        }
    }
}
