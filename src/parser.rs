//! Entry point for turning a scan report into network records.
//!
//! The whole report is consumed in one pass. Each call owns its own
//! accumulator, so independent calls may run concurrently.

use chrono::{DateTime, Local};
use tracing::debug;

use crate::assembler::{FormatStrategy, IwlistStrategy, NetshStrategy, RecordAssembler};
use crate::network::{NetworkRecord, ScanFormat};
use crate::stats::ScanStats;

/// Parse a complete scan report.
///
/// Never fails: lines that cannot be interpreted are skipped, and a report
/// with nothing recognizable yields an empty vector.
///
/// # Example
///
/// ```
/// use wifi_scan_parser::{ScanFormat, parse};
///
/// let report = "ESSID:\"HomeNet\"\nQuality=50/70  Signal level=-60 dBm\nChannel:6\n";
/// let records = parse(report, ScanFormat::Iwlist);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].name, "HomeNet");
/// assert_eq!(records[0].signal_strength, 80);
/// ```
pub fn parse(raw: &str, format: ScanFormat) -> Vec<NetworkRecord> {
    parse_with(raw, format, &ScanStats::new(), Local::now)
}

/// Parse a complete scan report, recording into `stats` and stamping
/// records with times taken from `clock`.
pub fn parse_with<C>(raw: &str, format: ScanFormat, stats: &ScanStats, mut clock: C) -> Vec<NetworkRecord>
where
    C: FnMut() -> DateTime<Local>,
{
    let records = match format {
        ScanFormat::Netsh => run(NetshStrategy, raw, stats, &mut clock),
        ScanFormat::Iwlist => run(IwlistStrategy, raw, stats, &mut clock),
    };
    debug!(%format, records = records.len(), "Parsed scan report");
    records
}

fn run<'s, S: FormatStrategy>(
    strategy: S,
    raw: &str,
    stats: &'s ScanStats,
    clock: &'s mut dyn FnMut() -> DateTime<Local>,
) -> Vec<NetworkRecord> {
    let mut assembler = RecordAssembler::new(strategy, stats, clock);
    for line in raw.lines() {
        assembler.feed(line);
    }
    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::Ordering;

    const NETSH_REPORT: &str = "\
Interface name : Wi-Fi
There are 2 networks currently visible.

SSID 1 : HomeNet
    Network type            : Infrastructure
    Authentication          : WPA2-Personal
    Encryption              : CCMP
    BSSID 1                 : aa:bb:cc:dd:ee:01
         Signal             : 85%
         Radio type         : 802.11ac
         Channel            : 36
         Basic rates (Mbps) : 6 12 24
         Other rates (Mbps) : 9 18 36 48 54

SSID 2 : Cafe Guest
    Network type            : Infrastructure
    Authentication          : Open
    Encryption              : None
    BSSID 1                 : aa:bb:cc:dd:ee:02
         Signal             : 41%
         Radio type         : 802.11n
         Channel            : 6
         Basic rates (Mbps) : 1 2 5.5 11
";

    const IWLIST_REPORT: &str = r#"wlan0     Scan completed :
          Cell 01 - Address: AA:BB:CC:DD:EE:01
                    ESSID:"HomeNet"
                    Quality=66/70  Signal level=-44 dBm
                    Channel:36
                    Frequency:5.18 GHz (Channel 36)
                    Encryption key:on
          Cell 02 - Address: AA:BB:CC:DD:EE:02
                    ESSID:"Cafe Guest"
                    Quality=40/70  Signal level=-75 dBm
                    Channel:6
                    Frequency:2.437 GHz (Channel 6)
                    Encryption key:off
"#;

    /// Cells in the order iwlist actually prints them: channel first, name last.
    const IWLIST_DEVICE_ORDER_REPORT: &str = r#"wlan0     Scan completed :
          Cell 01 - Address: AA:BB:CC:DD:EE:01
                    Channel:36
                    Frequency:5.18 GHz (Channel 36)
                    Quality=66/70  Signal level=-44 dBm
                    ESSID:"HomeNet"
          Cell 02 - Address: AA:BB:CC:DD:EE:02
                    Channel:6
                    Frequency:2.437 GHz (Channel 6)
                    Quality=40/70  Signal level=-75 dBm
                    ESSID:"Cafe Guest"
          Cell 03 - Address: AA:BB:CC:DD:EE:03
                    Channel:11
                    Frequency:2.462 GHz (Channel 11)
                    Quality=50/70  Signal level=-60 dBm
                    ESSID:"Lab"
"#;

    fn fixed_clock() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn triples(records: &[NetworkRecord]) -> Vec<(&str, u8, u16)> {
        records.iter().map(NetworkRecord::reading).collect()
    }

    #[test]
    fn test_parse_netsh_report() {
        let records = parse(NETSH_REPORT, ScanFormat::Netsh);
        assert_eq!(
            triples(&records),
            vec![("HomeNet", 85, 36), ("Cafe Guest", 41, 6)]
        );
    }

    #[test]
    fn test_parse_iwlist_report() {
        let records = parse(IWLIST_REPORT, ScanFormat::Iwlist);
        assert_eq!(
            triples(&records),
            vec![("HomeNet", 100, 36), ("Cafe Guest", 50, 6)]
        );
    }

    /// A channel line completes the entry it joins, so in device order each
    /// name pairs with the following cell's channel and the last cell, which
    /// has no channel line after it, is dropped.
    #[test]
    fn test_iwlist_device_order_pairs_name_with_next_channel() {
        let stats = ScanStats::new();
        let records = parse_with(
            IWLIST_DEVICE_ORDER_REPORT,
            ScanFormat::Iwlist,
            &stats,
            fixed_clock,
        );

        assert_eq!(
            triples(&records),
            vec![("HomeNet", 100, 6), ("Cafe Guest", 50, 11)]
        );
        assert_eq!(stats.partials_dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_parse_with_clock_and_stats() {
        let stats = ScanStats::new();
        let records = parse_with(IWLIST_REPORT, ScanFormat::Iwlist, &stats, fixed_clock);

        assert!(records.iter().all(|r| r.observed_at == fixed_clock()));
        assert_eq!(stats.records_emitted.load(Ordering::Relaxed), 2);
        assert_eq!(stats.name_lines.load(Ordering::Relaxed), 2);
        // The "Frequency ... (Channel N)" lines are channel lines with unusable values
        assert_eq!(stats.channel_lines.load(Ordering::Relaxed), 4);
        assert_eq!(stats.field_errors.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_timestamp_taken_at_emission() {
        let mut ticks = 0;
        let clock = || {
            ticks += 1;
            Local.with_ymd_and_hms(2024, 5, 1, 9, 30, ticks).unwrap()
        };
        let records = parse_with(NETSH_REPORT, ScanFormat::Netsh, &ScanStats::new(), clock);
        assert!(records[0].observed_at < records[1].observed_at);
    }

    #[test]
    fn test_wrong_format_yields_nothing() {
        assert!(parse(NETSH_REPORT, ScanFormat::Iwlist).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("", ScanFormat::Netsh).is_empty());
        assert!(parse("", ScanFormat::Iwlist).is_empty());
        assert!(parse("\n\n   \n", ScanFormat::Netsh).is_empty());
    }

    #[test]
    fn test_crlf_input() {
        let report = "SSID 1 : Net1\r\nSignal : 70%\r\nChannel : 6\r\n";
        assert_eq!(
            triples(&parse(report, ScanFormat::Netsh)),
            vec![("Net1", 70, 6)]
        );
    }

    #[test]
    fn test_reparse_is_stable() {
        let first = parse(NETSH_REPORT, ScanFormat::Netsh);
        let second = parse(NETSH_REPORT, ScanFormat::Netsh);
        assert_eq!(triples(&first), triples(&second));
    }
}
