//! Data structures representing observed Wi-Fi networks.
//!
//! This module defines the core types shared by the classifier, the
//! assembler and the output collaborators.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upstream report layout being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanFormat {
    /// Format A: Windows `netsh wlan show networks mode=Bssid`.
    Netsh,
    /// Format B: Linux `iwlist <iface> scan`.
    Iwlist,
}

impl ScanFormat {
    /// Pick the format produced by the scan utility of the host platform.
    pub fn for_host() -> Self {
        if cfg!(windows) {
            ScanFormat::Netsh
        } else {
            ScanFormat::Iwlist
        }
    }
}

impl fmt::Display for ScanFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFormat::Netsh => write!(f, "netsh"),
            ScanFormat::Iwlist => write!(f, "iwlist"),
        }
    }
}

impl FromStr for ScanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netsh" | "a" | "windows" => Ok(ScanFormat::Netsh),
            "iwlist" | "b" | "linux" => Ok(ScanFormat::Iwlist),
            other => Err(format!("unknown scan format: {}", other)),
        }
    }
}

/// A single network observation extracted from a scan report.
///
/// # Example
///
/// The iwlist block:
/// ```text
/// ESSID:"HomeNet"
/// Quality=60/70  Signal level=-60 dBm
/// Channel:6
/// ```
///
/// Would be assembled into a `NetworkRecord` with:
/// - `name`: "HomeNet"
/// - `signal_strength`: 80
/// - `channel`: 6
/// - `observed_at`: the moment the channel line closed the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    /// The network name (SSID). Never empty.
    pub name: String,

    /// Canonical signal percentage, 0 to 100.
    pub signal_strength: u8,

    /// Radio channel, always at least 1.
    pub channel: u16,

    /// When the record was finalized by the assembler.
    pub observed_at: DateTime<Local>,
}

impl NetworkRecord {
    /// The (name, signal, channel) triple, without the timestamp.
    pub fn reading(&self) -> (&str, u8, u16) {
        (&self.name, self.signal_strength, self.channel)
    }

    /// Returns the Wi-Fi band for this record's channel.
    ///
    /// Channels 1-14 are 2.4GHz. Everything above is reported as 5GHz,
    /// since neither scan utility distinguishes 6GHz by channel alone.
    pub fn band(&self) -> &'static str {
        match self.channel {
            1..=14 => "2.4GHz",
            _ => "5GHz",
        }
    }
}

impl fmt::Display for NetworkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<32} {:>3}% ch {:>3} ({}) {}",
            self.name,
            self.signal_strength,
            self.channel,
            self.band(),
            self.observed_at.format("%H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(channel: u16) -> NetworkRecord {
        NetworkRecord {
            name: "HomeNet".to_string(),
            signal_strength: 80,
            channel,
            observed_at: Local::now(),
        }
    }

    #[test]
    fn test_band_detection() {
        assert_eq!(make_record(1).band(), "2.4GHz");
        assert_eq!(make_record(14).band(), "2.4GHz");
        assert_eq!(make_record(36).band(), "5GHz");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("netsh".parse::<ScanFormat>(), Ok(ScanFormat::Netsh));
        assert_eq!("IWLIST".parse::<ScanFormat>(), Ok(ScanFormat::Iwlist));
        assert_eq!("b".parse::<ScanFormat>(), Ok(ScanFormat::Iwlist));
        assert!("airport".parse::<ScanFormat>().is_err());
    }

    #[test]
    fn test_reading_excludes_timestamp() {
        let record = make_record(11);
        assert_eq!(record.reading(), ("HomeNet", 80, 11));
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(make_record(6)).unwrap();
        assert_eq!(json["name"], "HomeNet");
        assert_eq!(json["signal_strength"], 80);
        assert_eq!(json["channel"], 6);
        assert!(json["observed_at"].is_string());
    }
}
