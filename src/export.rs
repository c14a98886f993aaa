//! CSV export of parsed network records.
//!
//! Files are named after the time of the scan, e.g.
//! `wifi_data_20240501_093000.csv`, and hold one row per record:
//!
//! ```text
//! name,signal_strength,channel,observed_at
//! HomeNet,85,36,2024-05-01T09:30:00+02:00
//! ```

use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::network::NetworkRecord;

/// Errors that can occur while writing output files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Font error: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
}

/// File name for a CSV export taken at `now`.
pub fn csv_file_name(now: DateTime<Local>) -> String {
    format!("wifi_data_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Write `records` as CSV, header first, in the given order.
pub fn write_csv<W: Write>(records: &[NetworkRecord], writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `records` to a timestamped CSV file in `dir`.
///
/// Returns `Ok(None)` without touching the filesystem when there is
/// nothing to write.
pub fn save_csv(
    records: &[NetworkRecord],
    dir: &Path,
    now: DateTime<Local>,
) -> Result<Option<PathBuf>, ExportError> {
    if records.is_empty() {
        return Ok(None);
    }

    let path = dir.join(csv_file_name(now));
    let file = File::create(&path)?;
    write_csv(records, file)?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(Some(path))
}
