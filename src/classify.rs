//! Line classification for the two scan report formats.
//!
//! Each line of a report is tagged as a name, signal or channel line (with
//! its raw value) or as something to ignore. Numeric interpretation of the
//! raw values happens later, in the assembler, so a malformed token never
//! turns into an error here.
//!
//! # netsh (format A)
//! ```text
//! SSID 1 : HomeNet
//!     Network type            : Infrastructure
//!     BSSID 1                 : aa:bb:cc:dd:ee:ff
//!          Signal             : 85%
//!          Channel            : 6
//! ```
//!
//! # iwlist (format B)
//! ```text
//! Cell 01 - Address: AA:BB:CC:DD:EE:FF
//!           Channel:6
//!           Quality=60/70  Signal level=-60 dBm
//!           ESSID:"HomeNet"
//! ```

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_till, take_until},
    character::complete::{char, digit1},
    combinator::{recognize, rest},
    sequence::preceded,
};

use crate::network::ScanFormat;

const NETSH_NAME_MARKER: &str = "SSID";
const NETSH_BSSID_MARKER: &str = "BSSID";
const NETSH_SIGNAL_MARKER: &str = "Signal";
const CHANNEL_MARKER: &str = "Channel";
const IWLIST_NAME_MARKER: &str = "ESSID";
const IWLIST_QUALITY_MARKER: &str = "Quality";
const IWLIST_SIGNAL_LEVEL: &str = "Signal level=";

/// The role a single report line plays.
///
/// `None` in a signal or channel line means the marker was present but no
/// usable raw value could be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    Name(&'a str),
    Signal(Option<&'a str>),
    Channel(Option<&'a str>),
    Other,
}

impl LineClass<'_> {
    /// Short label used in logs and statistics.
    pub fn label(&self) -> &'static str {
        match self {
            LineClass::Name(_) => "name",
            LineClass::Signal(_) => "signal",
            LineClass::Channel(_) => "channel",
            LineClass::Other => "other",
        }
    }
}

/// Classify a line according to the given report format.
pub fn classify(line: &str, format: ScanFormat) -> LineClass<'_> {
    match format {
        ScanFormat::Netsh => classify_netsh(line),
        ScanFormat::Iwlist => classify_iwlist(line),
    }
}

/// Classify a line of `netsh wlan show networks mode=Bssid` output.
pub fn classify_netsh(line: &str) -> LineClass<'_> {
    let line = line.trim();

    if line.contains(NETSH_NAME_MARKER) && !line.contains(NETSH_BSSID_MARKER) {
        return match value_after_separator(line) {
            Some(name) => LineClass::Name(name),
            None => LineClass::Other,
        };
    }

    if line.contains(NETSH_SIGNAL_MARKER) {
        return LineClass::Signal(value_after_separator(line));
    }

    if line.contains(CHANNEL_MARKER) {
        // Tolerates annotations like "6 (2.4GHz)" by taking the first digit run.
        let channel = value_after_separator(line).and_then(first_digit_run);
        return LineClass::Channel(channel);
    }

    LineClass::Other
}

/// Classify a line of `iwlist <iface> scan` output.
pub fn classify_iwlist(line: &str) -> LineClass<'_> {
    let line = line.trim();

    if line.contains(IWLIST_NAME_MARKER) {
        return match value_after_separator(line) {
            Some(name) => LineClass::Name(name.trim_matches('"')),
            None => LineClass::Other,
        };
    }

    if line.contains(IWLIST_QUALITY_MARKER) {
        return LineClass::Signal(signal_level(line));
    }

    if line.contains(CHANNEL_MARKER) {
        return LineClass::Channel(value_after_separator(line));
    }

    LineClass::Other
}

/// Everything after the first `:`, trimmed.
///
/// Later colons stay in the value on purpose, so names such as `Lab:5G`
/// come through whole rather than cut at their own colon.
fn value_after_separator(line: &str) -> Option<&str> {
    let result: IResult<&str, &str> =
        preceded((take_until(":"), char(':')), rest).parse(line);
    result.ok().map(|(_, value)| value.trim())
}

/// The first run of ASCII digits anywhere in the input.
fn first_digit_run(input: &str) -> Option<&str> {
    let result: IResult<&str, &str> =
        preceded(take_till(|c: char| c.is_ascii_digit()), digit1).parse(input);
    result.ok().map(|(_, digits)| digits)
}

/// The negative integer in an embedded `Signal level=-NN` token.
fn signal_level(line: &str) -> Option<&str> {
    let result: IResult<&str, &str> = preceded(
        (take_until(IWLIST_SIGNAL_LEVEL), tag(IWLIST_SIGNAL_LEVEL)),
        recognize((char('-'), digit1)),
    )
    .parse(line);
    result.ok().map(|(_, level)| level)
}
