//! wifi-scan-parser CLI - Scan nearby Wi-Fi networks and chart their signal strength.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wifi_scan_parser::{
    config::{Config, FormatChoice},
    export::save_csv,
    heatmap::save_heatmap,
    network::{NetworkRecord, ScanFormat},
    parser::parse_with,
    scanner::scan_networks,
    stats::ScanStats,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Auto,
    Netsh,
    Iwlist,
}

impl From<FormatArg> for FormatChoice {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => FormatChoice::Auto,
            FormatArg::Netsh => FormatChoice::Netsh,
            FormatArg::Iwlist => FormatChoice::Iwlist,
        }
    }
}

/// wifi-scan-parser - Scan nearby Wi-Fi networks and chart their signal strength
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Parse a saved scan report instead of running the scanner ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Report format (defaults to the host platform's scanner)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Wireless interface to scan (iwlist only)
    #[arg(long, env = "WIFI_SCAN_INTERFACE")]
    interface: Option<String>,

    /// Directory for CSV and heatmap output
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Name of the place the scan was taken
    #[arg(short, long)]
    location: Option<String>,

    /// Do not write a CSV file
    #[arg(long)]
    no_csv: bool,

    /// Do not render a heatmap
    #[arg(long)]
    no_heatmap: bool,

    /// Print each record as a JSON line
    #[arg(long)]
    json: bool,

    /// Print parse statistics
    #[arg(long)]
    stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of the file configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if let Some(ref interface) = self.interface {
            config.interface = interface.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(ref location) = self.location {
            config.location_name = location.clone();
        }
        if self.no_csv {
            config.write_csv = false;
        }
        if self.no_heatmap {
            config.write_heatmap = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::load()?;
    args.apply(&mut config);
    config.validate()?;

    let format = config.format.resolve();
    info!("Scanning at {} ({} format)", config.location_name, format);

    let stats = ScanStats::new();
    let records = collect_records(args.input.as_deref(), format, &config, &stats).await?;

    if args.stats {
        println!("{}", stats.summary());
    } else {
        debug!("\n{}", stats.summary());
    }

    if records.is_empty() {
        warn!("No networks found!");
        return Ok(());
    }

    info!("Found {} networks", records.len());
    report_records(&records, args.json)?;

    let now = Local::now();
    if config.write_csv
        && let Some(path) = save_csv(&records, &config.output_dir, now)
            .context("Failed to write network data")?
    {
        info!("Network data saved to {}", path.display());
    }

    if config.write_heatmap
        && let Some(path) = save_heatmap(
            &records,
            &config.output_dir,
            now,
            &config.location_name,
            config.heatmap.cell_size,
        )
        .context("Failed to write heatmap")?
    {
        info!("Heatmap saved to {}", path.display());
    }

    Ok(())
}

/// Parse the report at `input`, or run the scanner when there is none.
///
/// An unreadable input file is an error. A scan that cannot be run only
/// yields no records.
async fn collect_records(
    input: Option<&Path>,
    format: ScanFormat,
    config: &Config,
    stats: &ScanStats,
) -> Result<Vec<NetworkRecord>> {
    match input {
        Some(path) => Ok(parse_with(&read_input(path)?, format, stats, Local::now)),
        None => Ok(scan_networks(format, &config.scanner(), stats).await),
    }
}

/// Read a saved report from `path`, or from stdin when `path` is "-".
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut report = String::new();
        std::io::stdin()
            .read_to_string(&mut report)
            .context("Failed to read report from stdin")?;
        return Ok(report);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))
}

/// Print the records, as JSON lines or a plain listing.
fn report_records(records: &[NetworkRecord], json: bool) -> Result<()> {
    for record in records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{}", record);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "wifi-scan-parser",
            "--format",
            "iwlist",
            "--interface",
            "wlp3s0",
            "--no-csv",
            "--location",
            "attic",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.format, FormatChoice::Iwlist);
        assert_eq!(config.interface, "wlp3s0");
        assert_eq!(config.location_name, "attic");
        assert!(!config.write_csv);
        assert!(config.write_heatmap);
    }

    #[test]
    fn test_args_keep_config_defaults() {
        let args = Args::parse_from(["wifi-scan-parser"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.format, FormatChoice::Auto);
        assert!(config.write_csv);
        assert!(config.write_heatmap);
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(&path, "ESSID:\"Net\"\n").unwrap();

        let report = read_input(&path).unwrap();
        assert_eq!(report, "ESSID:\"Net\"\n");
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/scan.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scan.txt"));
    }

    #[tokio::test]
    async fn test_missing_input_file_is_an_error() {
        let result = collect_records(
            Some(Path::new("/nonexistent/scan.txt")),
            ScanFormat::Iwlist,
            &Config::default(),
            &ScanStats::new(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_collect_records_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(
            &path,
            "ESSID:\"Net\"\nQuality=40/70  Signal level=-60 dBm\nChannel:6\n",
        )
        .unwrap();

        let records = collect_records(
            Some(&path),
            ScanFormat::Iwlist,
            &Config::default(),
            &ScanStats::new(),
        )
        .await
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Net");
    }
}
