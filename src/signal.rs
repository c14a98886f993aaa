//! Signal strength normalization.
//!
//! The two scan utilities report signal quality on incompatible scales:
//! netsh prints a percentage (`85%`), iwlist prints a level in dBm
//! (`Signal level=-60 dBm`). Both are mapped onto one canonical 0-100
//! percentage here.

use thiserror::Error;

/// Upper bound of the canonical signal scale.
pub const MAX_SIGNAL: u8 = 100;

/// A recognized line carried a value that could not be used.
///
/// These errors never leave the assembler; the affected field is simply
/// left unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldParseError {
    #[error("Invalid {field} value: {raw:?}")]
    InvalidNumber { field: &'static str, raw: String },

    #[error("{field} value out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// How a raw signal token is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRepresentation {
    /// A percentage, optionally suffixed with `%`.
    Percentage,
    /// A (negative) level in dBm.
    DecibelMilliwatt,
}

/// Convert a raw signal token into the canonical 0-100 scale.
///
/// # Example
///
/// ```
/// use wifi_scan_parser::signal::{normalize, SignalRepresentation};
///
/// assert_eq!(normalize("85%", SignalRepresentation::Percentage), Ok(85));
/// assert_eq!(normalize("-70", SignalRepresentation::DecibelMilliwatt), Ok(60));
/// ```
pub fn normalize(raw: &str, representation: SignalRepresentation) -> Result<u8, FieldParseError> {
    match representation {
        SignalRepresentation::Percentage => {
            let digits = raw.trim();
            let digits = digits.strip_suffix('%').unwrap_or(digits).trim();
            let value = parse_signal_number(digits, raw)?;
            Ok(value.unsigned_abs().min(MAX_SIGNAL as u64) as u8)
        }
        SignalRepresentation::DecibelMilliwatt => {
            let value = parse_signal_number(raw.trim(), raw)?;
            let dbm = i32::try_from(value).map_err(|_| FieldParseError::OutOfRange {
                field: "signal",
                value,
            })?;
            Ok(normalize_dbm(dbm))
        }
    }
}

/// Map a dBm level onto the canonical percentage scale.
///
/// This is a rough heuristic, `(100 + dbm) * 2` clamped to 0-100, so
/// -50 dBm and stronger read as 100 and -100 dBm and weaker read as 0.
/// It is not a physically meaningful conversion.
pub fn normalize_dbm(dbm: i32) -> u8 {
    let percent = (100i64 + dbm as i64) * 2;
    percent.clamp(0, MAX_SIGNAL as i64) as u8
}

fn parse_signal_number(digits: &str, raw: &str) -> Result<i64, FieldParseError> {
    digits
        .parse::<i64>()
        .map_err(|_| FieldParseError::InvalidNumber {
            field: "signal",
            raw: raw.to_string(),
        })
}

/// Parse a channel number, rejecting zero.
pub fn parse_channel(raw: &str) -> Result<u16, FieldParseError> {
    let raw_trimmed = raw.trim();
    let value = raw_trimmed
        .parse::<i64>()
        .map_err(|_| FieldParseError::InvalidNumber {
            field: "channel",
            raw: raw.to_string(),
        })?;
    match u16::try_from(value) {
        Ok(channel) if channel > 0 => Ok(channel),
        _ => Err(FieldParseError::OutOfRange {
            field: "channel",
            value,
        }),
    }
}
