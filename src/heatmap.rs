//! Signal strength heatmap: networks by channel.
//!
//! Records are pivoted into a matrix with one row per network name and one
//! column per channel. Each cell holds the mean signal strength of the
//! matching records. The matrix is then rendered as a PNG, one colored
//! square per cell on a yellow-orange-red scale, labelled with network
//! names, channels, the per-cell mean and a title naming the location.

use ab_glyph::{FontRef, PxScale};
use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::export::ExportError;
use crate::network::NetworkRecord;

/// Default edge length of one heatmap cell, in pixels.
pub const DEFAULT_CELL_SIZE: u32 = 48;

/// Largest accepted cell edge, in pixels.
pub const MAX_CELL_SIZE: u32 = 512;

/// Cells smaller than this are not annotated with their value.
const MIN_ANNOTATED_CELL: u32 = 16;

const PADDING: u32 = 8;
const TITLE_SCALE: PxScale = PxScale { x: 18.0, y: 18.0 };
const LABEL_SCALE: f32 = 14.0;
/// Measured for the height of one label row.
const LABEL_SAMPLE: &str = "SSID Channel 0123456789";

/// Canvas color, which also shows through as the grid lines.
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const EMPTY_COLOR: Rgb<u8> = Rgb([224, 224, 224]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// DejaVu Sans, see `assets/DejaVuSans-LICENSE.txt`.
static LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Color stops of the yellow-orange-red ramp, from 0% to 100%.
const YL_OR_RD: [[u8; 3]; 5] = [
    [255, 255, 204],
    [254, 217, 118],
    [253, 141, 60],
    [227, 26, 28],
    [128, 0, 38],
];

/// Mean signal strength per (network, channel) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    names: Vec<String>,
    channels: Vec<u16>,
    /// Row-major, `names.len() * channels.len()` entries.
    cells: Vec<Option<f64>>,
}

impl SignalMatrix {
    /// Pivot `records` into a name x channel matrix of mean signal strength.
    pub fn from_records(records: &[NetworkRecord]) -> Self {
        let mut sums: BTreeMap<(&str, u16), (u64, u64)> = BTreeMap::new();
        let mut channels = BTreeSet::new();

        for record in records {
            let entry = sums
                .entry((record.name.as_str(), record.channel))
                .or_insert((0, 0));
            entry.0 += record.signal_strength as u64;
            entry.1 += 1;
            channels.insert(record.channel);
        }

        let names: Vec<String> = sums
            .keys()
            .map(|(name, _)| *name)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let channels: Vec<u16> = channels.into_iter().collect();

        let cells = names
            .iter()
            .flat_map(|name| {
                let sums = &sums;
                channels.iter().map(move |channel| {
                    sums.get(&(name.as_str(), *channel))
                        .map(|(sum, count)| *sum as f64 / *count as f64)
                })
            })
            .collect();

        Self {
            names,
            channels,
            cells,
        }
    }

    /// Row labels, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Column labels, ascending.
    pub fn channels(&self) -> &[u16] {
        &self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Mean signal strength for `name` on `channel`, if it was observed.
    pub fn mean(&self, name: &str, channel: u16) -> Option<f64> {
        let row = self.names.iter().position(|n| n == name)?;
        let col = self.channels.iter().position(|c| *c == channel)?;
        self.cell(row, col)
    }

    fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells
            .get(row * self.channels.len() + col)
            .copied()
            .flatten()
    }
}

impl fmt::Display for SignalMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.names.iter().map(String::len).max().unwrap_or(0).max(4);
        write!(f, "{:<width$}", "SSID")?;
        for channel in &self.channels {
            write!(f, " {:>5}", channel)?;
        }
        writeln!(f)?;

        for (row, name) in self.names.iter().enumerate() {
            write!(f, "{:<width$}", name)?;
            for col in 0..self.channels.len() {
                match self.cell(row, col) {
                    Some(mean) => write!(f, " {:>5.0}", mean)?,
                    None => write!(f, " {:>5}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Color for a signal percentage on the yellow-orange-red ramp.
pub fn signal_color(signal: f64) -> Rgb<u8> {
    let t = (signal / 100.0).clamp(0.0, 1.0) * (YL_OR_RD.len() - 1) as f64;
    let lower = (t.floor() as usize).min(YL_OR_RD.len() - 2);
    let frac = t - lower as f64;
    let (a, b) = (YL_OR_RD[lower], YL_OR_RD[lower + 1]);

    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// Geometry of a rendered heatmap.
///
/// The grid sits below the title and the `SSID` header, right of the
/// network names, with channel numbers and the `Channel` label under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapLayout {
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the grid, on its outer grid line.
    pub grid_x: u32,
    pub grid_y: u32,
    pub cell_size: u32,
}

impl HeatmapLayout {
    fn new(matrix: &SignalMatrix, title: &str, cell_size: u32, font: &FontRef<'_>) -> Self {
        let cell_size = cell_size.clamp(1, MAX_CELL_SIZE);
        let stride = cell_size + 1;
        let grid_w = matrix.channels.len() as u32 * stride + 1;
        let grid_h = matrix.names.len() as u32 * stride + 1;

        let (title_w, title_h) = text_size(TITLE_SCALE, font, title);
        let (_, label_h) = text_size(LABEL_SCALE, font, LABEL_SAMPLE);
        let names_w = matrix
            .names
            .iter()
            .map(String::as_str)
            .chain(["SSID"])
            .map(|name| text_size(LABEL_SCALE, font, name).0)
            .max()
            .unwrap_or(0);

        let grid_x = PADDING + names_w + PADDING;
        let grid_y = PADDING + title_h + PADDING + label_h + PADDING;
        Self {
            width: (grid_x + grid_w + PADDING).max(PADDING + title_w + PADDING),
            height: grid_y + grid_h + PADDING + label_h + PADDING + label_h + PADDING,
            grid_x,
            grid_y,
            cell_size,
        }
    }

    /// Top-left pixel inside the cell at `row`, `col`.
    pub fn cell_origin(&self, row: u32, col: u32) -> (u32, u32) {
        let stride = self.cell_size + 1;
        (self.grid_x + col * stride + 1, self.grid_y + row * stride + 1)
    }
}

/// Title line naming where the scan was taken.
pub fn heatmap_title(location: &str) -> String {
    format!("Wi-Fi Networks Signal Strength at {}", location)
}

fn label_font() -> Result<FontRef<'static>, ExportError> {
    Ok(FontRef::try_from_slice(LABEL_FONT)?)
}

/// Draw `matrix` as an image titled with `location`.
///
/// Each cell is a `cell_size` square with a one pixel grid between cells,
/// annotated with its rounded mean when the cell is large enough to hold it.
/// `cell_size` is clamped to `1..=MAX_CELL_SIZE`.
pub fn render(
    matrix: &SignalMatrix,
    location: &str,
    cell_size: u32,
) -> Result<(RgbImage, HeatmapLayout), ExportError> {
    let font = label_font()?;
    let title = heatmap_title(location);
    let layout = HeatmapLayout::new(matrix, &title, cell_size, &font);
    let cell_size = layout.cell_size;
    let stride = cell_size + 1;

    let mut img = RgbImage::from_pixel(layout.width, layout.height, BACKGROUND);
    draw_text_mut(&mut img, TEXT_COLOR, PADDING as i32, PADDING as i32, TITLE_SCALE, &font, &title);

    let (_, label_h) = text_size(LABEL_SCALE, &font, LABEL_SAMPLE);
    let header_y = layout.grid_y - PADDING - label_h;
    draw_text_mut(&mut img, TEXT_COLOR, PADDING as i32, header_y as i32, LABEL_SCALE, &font, "SSID");

    let grid_w = matrix.channels.len() as u32 * stride + 1;
    let grid_h = matrix.names.len() as u32 * stride + 1;

    let value_scale = (cell_size as f32 * 0.4).min(LABEL_SCALE);
    for (row, name) in matrix.names.iter().enumerate() {
        let (_, y0) = layout.cell_origin(row as u32, 0);
        let (_, name_h) = text_size(LABEL_SCALE, &font, name);
        let name_y = y0 + cell_size.saturating_sub(name_h) / 2;
        draw_text_mut(&mut img, TEXT_COLOR, PADDING as i32, name_y as i32, LABEL_SCALE, &font, name);

        for col in 0..matrix.channels.len() {
            let (x0, y0) = layout.cell_origin(row as u32, col as u32);
            let mean = matrix.cell(row, col);
            let color = mean.map(signal_color).unwrap_or(EMPTY_COLOR);
            for y in y0..y0 + cell_size {
                for x in x0..x0 + cell_size {
                    img.put_pixel(x, y, color);
                }
            }

            if let Some(mean) = mean
                && cell_size >= MIN_ANNOTATED_CELL
            {
                let value = format!("{:.0}", mean);
                let (w, h) = text_size(value_scale, &font, &value);
                let ink = if mean > 60.0 { LIGHT_TEXT_COLOR } else { TEXT_COLOR };
                draw_text_mut(
                    &mut img,
                    ink,
                    (x0 + cell_size.saturating_sub(w) / 2) as i32,
                    (y0 + cell_size.saturating_sub(h) / 2) as i32,
                    value_scale,
                    &font,
                    &value,
                );
            }
        }
    }

    let ticks_y = layout.grid_y + grid_h + PADDING;
    for (col, channel) in matrix.channels.iter().enumerate() {
        let (x0, _) = layout.cell_origin(0, col as u32);
        let tick = channel.to_string();
        let (w, _) = text_size(LABEL_SCALE, &font, &tick);
        let x = x0 + cell_size.saturating_sub(w) / 2;
        draw_text_mut(&mut img, TEXT_COLOR, x as i32, ticks_y as i32, LABEL_SCALE, &font, &tick);
    }

    let (axis_w, _) = text_size(LABEL_SCALE, &font, "Channel");
    let axis_x = layout.grid_x + grid_w.saturating_sub(axis_w) / 2;
    let axis_y = ticks_y + label_h + PADDING;
    draw_text_mut(&mut img, TEXT_COLOR, axis_x as i32, axis_y as i32, LABEL_SCALE, &font, "Channel");

    Ok((img, layout))
}

/// Render `matrix` and save it as a PNG at `path`.
pub fn render_png(
    matrix: &SignalMatrix,
    path: &Path,
    location: &str,
    cell_size: u32,
) -> Result<(), ExportError> {
    let (img, _) = render(matrix, location, cell_size)?;
    img.save(path)?;
    Ok(())
}

/// File name for a heatmap taken at `now`.
pub fn heatmap_file_name(now: DateTime<Local>) -> String {
    format!("wifi_heatmap_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Build and save a heatmap of `records` taken at `location` in `dir`.
///
/// Returns `Ok(None)` when there are no records to plot.
pub fn save_heatmap(
    records: &[NetworkRecord],
    dir: &Path,
    now: DateTime<Local>,
    location: &str,
    cell_size: u32,
) -> Result<Option<PathBuf>, ExportError> {
    if records.is_empty() {
        warn!("No networks found!");
        return Ok(None);
    }

    let matrix = SignalMatrix::from_records(records);
    debug!("Signal matrix:\n{}", matrix);

    let path = dir.join(heatmap_file_name(now));
    render_png(&matrix, &path, location, cell_size)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn scan_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn record(name: &str, signal_strength: u8, channel: u16) -> NetworkRecord {
        NetworkRecord {
            name: name.to_string(),
            signal_strength,
            channel,
            observed_at: scan_time(),
        }
    }

    #[test]
    fn test_matrix_means() {
        let matrix = SignalMatrix::from_records(&[
            record("Office", 90, 1),
            record("Office", 40, 1),
            record("Office", 70, 36),
            record("Cafe", 30, 6),
        ]);

        assert_eq!(matrix.names(), ["Cafe", "Office"]);
        assert_eq!(matrix.channels(), [1, 6, 36]);
        assert_eq!(matrix.mean("Office", 1), Some(65.0));
        assert_eq!(matrix.mean("Office", 36), Some(70.0));
        assert_eq!(matrix.mean("Cafe", 6), Some(30.0));
        assert_eq!(matrix.mean("Cafe", 1), None);
        assert_eq!(matrix.mean("Nowhere", 1), None);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = SignalMatrix::from_records(&[]);
        assert!(matrix.is_empty());
        assert!(matrix.channels().is_empty());
    }

    #[test]
    fn test_matrix_table() {
        let matrix = SignalMatrix::from_records(&[record("Office", 90, 1), record("Cafe", 30, 6)]);
        let table = matrix.to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SSID"));
        assert!(lines[1].starts_with("Cafe"));
        assert!(lines[1].ends_with("30"));
        assert!(lines[2].contains("90"));
    }

    #[test]
    fn test_signal_color_endpoints() {
        assert_eq!(signal_color(0.0), Rgb([255, 255, 204]));
        assert_eq!(signal_color(100.0), Rgb([128, 0, 38]));
        assert_eq!(signal_color(50.0), Rgb([253, 141, 60]));
        assert_eq!(signal_color(250.0), Rgb([128, 0, 38]));
    }

    #[test]
    fn test_render_cells() {
        let matrix = SignalMatrix::from_records(&[record("Office", 100, 1), record("Cafe", 0, 6)]);
        let (img, layout) = render(&matrix, "Lab", 10).unwrap();

        assert_eq!(img.dimensions(), (layout.width, layout.height));
        // Grid line
        assert_eq!(*img.get_pixel(layout.grid_x, layout.grid_y), BACKGROUND);
        // Row 0 = Cafe: channel 1 empty, channel 6 at 0%
        let (x, y) = layout.cell_origin(0, 0);
        assert_eq!(*img.get_pixel(x + 5, y + 5), EMPTY_COLOR);
        let (x, y) = layout.cell_origin(0, 1);
        assert_eq!(*img.get_pixel(x + 5, y + 5), signal_color(0.0));
        // Row 1 = Office: channel 1 at 100%
        let (x, y) = layout.cell_origin(1, 0);
        assert_eq!(*img.get_pixel(x + 5, y + 5), signal_color(100.0));
    }

    #[test]
    fn test_render_makes_room_for_labels() {
        let matrix = SignalMatrix::from_records(&[record("Office", 80, 1), record("Cafe", 40, 6)]);
        let (img, layout) = render(&matrix, "Lab", 10).unwrap();

        let grid = 2 * 11 + 1;
        assert!(layout.grid_x > PADDING, "names column left of grid");
        assert!(layout.grid_y > PADDING, "title above grid");
        assert!(layout.width > layout.grid_x + grid);
        assert!(layout.height > layout.grid_y + grid, "channel axis below grid");

        // Title ink in the band above the grid
        let title_band = (0..layout.grid_y)
            .flat_map(|y| (0..layout.width).map(move |x| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y)[0] < 128);
        assert!(title_band);
    }

    #[test]
    fn test_long_name_widens_label_column() {
        let short = SignalMatrix::from_records(&[record("A", 80, 1)]);
        let long = SignalMatrix::from_records(&[record("A very long network name", 80, 1)]);

        let (_, short_layout) = render(&short, "Lab", 10).unwrap();
        let (_, long_layout) = render(&long, "Lab", 10).unwrap();
        assert!(long_layout.grid_x > short_layout.grid_x);
    }

    #[test]
    fn test_title_names_location() {
        assert_eq!(heatmap_title("attic"), "Wi-Fi Networks Signal Strength at attic");

        let matrix = SignalMatrix::from_records(&[record("A", 80, 1)]);
        let (_, short) = render(&matrix, "a", 10).unwrap();
        let (_, long) = render(&matrix, "the second floor conference room", 10).unwrap();
        assert!(long.width > short.width);
    }

    #[test]
    fn test_cell_value_is_annotated() {
        let matrix = SignalMatrix::from_records(&[record("Office", 20, 1)]);
        let (img, layout) = render(&matrix, "Lab", 40).unwrap();

        let (x0, y0) = layout.cell_origin(0, 0);
        let inked = (y0..y0 + 40)
            .flat_map(|y| (x0..x0 + 40).map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != signal_color(20.0));
        assert!(inked);
    }

    #[test]
    fn test_oversized_cells_are_clamped() {
        let matrix = SignalMatrix::from_records(&[record("Office", 20, 1)]);
        let (_, layout) = render(&matrix, "Lab", u32::MAX).unwrap();
        assert_eq!(layout.cell_size, MAX_CELL_SIZE);
    }

    #[test]
    fn test_save_heatmap() {
        let dir = TempDir::new().unwrap();
        let path = save_heatmap(&[record("Office", 80, 11)], dir.path(), scan_time(), "Lab", 8)
            .unwrap()
            .expect("heatmap should be written");

        assert_eq!(path.file_name().unwrap(), "wifi_heatmap_20240501_093000.png");
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_save_heatmap_skips_empty() {
        let dir = TempDir::new().unwrap();
        assert!(save_heatmap(&[], dir.path(), scan_time(), "Lab", 8).unwrap().is_none());
    }
}
