//! Statistics tracking for scan parsing.
//!
//! This module counts how report lines were classified, how many records
//! the assemblers emitted or dropped, and how signal strength is
//! distributed across the emitted records.

use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::classify::LineClass;
use crate::network::NetworkRecord;

/// Thread-safe statistics collector for parse passes.
#[derive(Debug)]
pub struct ScanStats {
    /// Total number of lines fed to an assembler
    pub lines_processed: AtomicU64,

    /// Lines classified as network names
    pub name_lines: AtomicU64,

    /// Lines classified as signal readings
    pub signal_lines: AtomicU64,

    /// Lines classified as channel readings
    pub channel_lines: AtomicU64,

    /// Lines that matched no marker
    pub other_lines: AtomicU64,

    /// Recognized lines whose value could not be used
    pub field_errors: AtomicU64,

    /// Records emitted by the assemblers
    pub records_emitted: AtomicU64,

    /// Accumulators closed without producing a record
    pub partials_dropped: AtomicU64,

    /// Histogram of canonical signal strengths
    signal_histogram: RwLock<Histogram<u64>>,

    /// Records per channel
    records_by_channel: RwLock<BTreeMap<u16, u64>>,

    /// When stats collection started
    start_time: Instant,
}

impl ScanStats {
    /// Create a new statistics collector.
    pub fn new() -> Self {
        Self {
            lines_processed: AtomicU64::new(0),
            name_lines: AtomicU64::new(0),
            signal_lines: AtomicU64::new(0),
            channel_lines: AtomicU64::new(0),
            other_lines: AtomicU64::new(0),
            field_errors: AtomicU64::new(0),
            records_emitted: AtomicU64::new(0),
            partials_dropped: AtomicU64::new(0),
            // Signal: 0 to 100 percent (offset by 1, the histogram has no zero bucket)
            signal_histogram: RwLock::new(
                Histogram::new_with_bounds(1, 101, 2).expect("Failed to create signal histogram"),
            ),
            records_by_channel: RwLock::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one classified line.
    pub fn record_line(&self, class: &LineClass<'_>) {
        self.lines_processed.fetch_add(1, Ordering::Relaxed);
        let counter = match class {
            LineClass::Name(_) => &self.name_lines,
            LineClass::Signal(_) => &self.signal_lines,
            LineClass::Channel(_) => &self.channel_lines,
            LineClass::Other => &self.other_lines,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recognized line whose value was unusable.
    pub fn record_field_error(&self) {
        self.field_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accumulator that closed incomplete.
    pub fn record_dropped(&self) {
        self.partials_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an emitted network record.
    pub fn record_network(&self, record: &NetworkRecord) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut hist) = self.signal_histogram.write() {
            let _ = hist.record(record.signal_strength as u64 + 1);
        }

        if let Ok(mut map) = self.records_by_channel.write() {
            *map.entry(record.channel).or_insert(0) += 1;
        }
    }

    /// Get the elapsed time since stats collection started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generate a summary report.
    pub fn summary(&self) -> StatsSummary {
        let records_emitted = self.records_emitted.load(Ordering::Relaxed);

        let signal_percentiles = self
            .signal_histogram
            .read()
            .ok()
            .filter(|h| !h.is_empty())
            .map(|h| HistogramPercentiles {
                // Subtract the offset to get back to real percentages
                p50: h.value_at_quantile(0.50).saturating_sub(1),
                p90: h.value_at_quantile(0.90).saturating_sub(1),
                min: h.min().saturating_sub(1),
                max: h.max().saturating_sub(1),
                mean: h.mean() - 1.0,
            });

        let records_by_channel = self
            .records_by_channel
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();

        StatsSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            lines_processed: self.lines_processed.load(Ordering::Relaxed),
            name_lines: self.name_lines.load(Ordering::Relaxed),
            signal_lines: self.signal_lines.load(Ordering::Relaxed),
            channel_lines: self.channel_lines.load(Ordering::Relaxed),
            other_lines: self.other_lines.load(Ordering::Relaxed),
            field_errors: self.field_errors.load(Ordering::Relaxed),
            records_emitted,
            partials_dropped: self.partials_dropped.load(Ordering::Relaxed),
            signal_percentiles,
            records_by_channel,
        }
    }
}

impl Default for ScanStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile values from a histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramPercentiles {
    pub p50: u64,
    pub p90: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Summary of collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub elapsed_secs: f64,
    pub lines_processed: u64,
    pub name_lines: u64,
    pub signal_lines: u64,
    pub channel_lines: u64,
    pub other_lines: u64,
    pub field_errors: u64,
    pub records_emitted: u64,
    pub partials_dropped: u64,
    pub signal_percentiles: Option<HistogramPercentiles>,
    pub records_by_channel: BTreeMap<u16, u64>,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "                 WI-FI SCAN STATISTICS")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Parse time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Lines processed: {}", self.lines_processed)?;
        writeln!(
            f,
            "  name: {}, signal: {}, channel: {}, other: {}",
            self.name_lines, self.signal_lines, self.channel_lines, self.other_lines
        )?;
        writeln!(f, "Field errors: {}", self.field_errors)?;
        writeln!(f, "Records emitted: {}", self.records_emitted)?;
        writeln!(f, "Incomplete records dropped: {}", self.partials_dropped)?;
        writeln!(f)?;

        if let Some(ref p) = self.signal_percentiles {
            writeln!(f, "Signal Distribution (%):")?;
            writeln!(f, "  Min: {}, Max: {}, Mean: {:.1}", p.min, p.max, p.mean)?;
            writeln!(f, "  P50: {}, P90: {}", p.p50, p.p90)?;
            writeln!(f)?;
        }

        if !self.records_by_channel.is_empty() {
            writeln!(f, "Records by Channel:")?;
            for (channel, count) in &self.records_by_channel {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
}
