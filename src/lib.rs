//! wifi-scan-parser - Turn Wi-Fi scan reports into normalized network records.
//!
//! This crate provides:
//! - Line classifiers for `netsh wlan show networks mode=Bssid` and
//!   `iwlist <iface> scan` output
//! - Record assemblers that decide where one network entry ends and the
//!   next begins, tolerating malformed and missing fields
//! - Signal normalization from percentages and dBm onto a 0-100 scale
//! - CSV export and a name x channel signal heatmap
//!
//! # Example
//!
//! ```rust
//! use wifi_scan_parser::{ScanFormat, parse};
//!
//! let report = "\
//! SSID 1 : HomeNet
//!     BSSID 1                 : aa:bb:cc:dd:ee:ff
//!          Signal             : 85%
//!          Channel            : 36
//! ";
//! let records = parse(report, ScanFormat::Netsh);
//!
//! assert_eq!(records[0].name, "HomeNet");
//! assert_eq!(records[0].signal_strength, 85);
//! assert_eq!(records[0].channel, 36);
//! ```

pub mod assembler;
pub mod classify;
pub mod config;
pub mod export;
pub mod heatmap;
pub mod network;
pub mod parser;
pub mod scanner;
pub mod signal;
pub mod stats;

pub use assembler::{CompletionRule, FormatStrategy, IwlistStrategy, NetshStrategy, RecordAssembler};
pub use classify::{LineClass, classify};
pub use config::{Config, FormatChoice};
pub use export::{ExportError, save_csv};
pub use heatmap::{SignalMatrix, save_heatmap};
pub use network::{NetworkRecord, ScanFormat};
pub use parser::{parse, parse_with};
pub use scanner::{ScanError, ScannerConfig, scan_networks};
pub use signal::{FieldParseError, SignalRepresentation, normalize};
pub use stats::{ScanStats, StatsSummary};
