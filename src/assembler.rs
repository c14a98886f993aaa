//! Record assembly from classified report lines.
//!
//! Neither report format delimits its entries explicitly, so records are
//! built up in a [`PartialRecord`] as lines arrive and promoted to a
//! [`NetworkRecord`] when a format-specific boundary is reached:
//!
//! - netsh: a new `SSID` line closes the previous entry, and the end of
//!   input closes the last one. At least three populated fields and a
//!   non-empty name are required.
//! - iwlist: a `Channel` line closes the entry when exactly three fields
//!   are populated and the name is non-empty. Nothing is flushed at the
//!   end of input; a trailing incomplete entry is discarded.
//!
//! Malformed values never abort assembly. The affected slot is left as it
//! was, the problem is logged at debug level and counted in [`ScanStats`].

use chrono::{DateTime, Local};
use tracing::{debug, trace};

use crate::classify::{LineClass, classify_iwlist, classify_netsh};
use crate::network::NetworkRecord;
use crate::signal::{SignalRepresentation, normalize, parse_channel};
use crate::stats::ScanStats;

/// Fields collected so far for the entry being assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialRecord {
    name: Option<String>,
    signal_strength: Option<u8>,
    channel: Option<u16>,
}

impl PartialRecord {
    fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Number of populated fields. An empty name still counts as populated.
    pub fn populated(&self) -> usize {
        [
            self.name.is_some(),
            self.signal_strength.is_some(),
            self.channel.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    /// Whether any field has been populated.
    pub fn is_open(&self) -> bool {
        self.populated() > 0
    }

    /// Whether the name is present and non-empty.
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }

    fn to_record(&self, observed_at: DateTime<Local>) -> Option<NetworkRecord> {
        match (&self.name, self.signal_strength, self.channel) {
            (Some(name), Some(signal_strength), Some(channel)) if !name.is_empty() => {
                Some(NetworkRecord {
                    name: name.clone(),
                    signal_strength,
                    channel,
                    observed_at,
                })
            }
            _ => None,
        }
    }
}

/// When an accumulator may be promoted to a record.
///
/// Both rules count populated fields rather than checking a schema; this
/// mirrors how the two report formats have always been interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRule {
    /// At least three populated fields and a non-empty name (netsh).
    AtLeastThreeFields,
    /// Exactly three populated fields and a non-empty name (iwlist).
    ExactlyThreeFields,
}

impl CompletionRule {
    pub fn accepts(&self, partial: &PartialRecord) -> bool {
        let count_ok = match self {
            CompletionRule::AtLeastThreeFields => partial.populated() >= 3,
            CompletionRule::ExactlyThreeFields => partial.populated() == 3,
        };
        count_ok && partial.has_name()
    }
}

/// Mutable state of one parse pass, shared by every format strategy.
pub struct Session<'s> {
    partial: PartialRecord,
    records: Vec<NetworkRecord>,
    clock: &'s mut dyn FnMut() -> DateTime<Local>,
    stats: &'s ScanStats,
}

impl<'s> Session<'s> {
    fn new(stats: &'s ScanStats, clock: &'s mut dyn FnMut() -> DateTime<Local>) -> Self {
        Self {
            partial: PartialRecord::default(),
            records: Vec::new(),
            clock,
            stats,
        }
    }

    /// The accumulator for the entry currently being assembled.
    pub fn partial(&self) -> &PartialRecord {
        &self.partial
    }

    /// Emit the accumulator as a record if `rule` accepts it.
    ///
    /// On success the record is stamped with the current time and the
    /// accumulator is reset. Otherwise the accumulator is left untouched.
    pub fn emit_if(&mut self, rule: CompletionRule) -> bool {
        if !rule.accepts(&self.partial) {
            return false;
        }
        let Some(record) = self.partial.to_record((self.clock)()) else {
            return false;
        };

        debug!(
            name = %record.name,
            signal = record.signal_strength,
            channel = record.channel,
            "Emitting network record"
        );
        self.stats.record_network(&record);
        self.records.push(record);
        self.partial = PartialRecord::default();
        true
    }

    /// Close the accumulator: emit it if `rule` accepts it, drop it otherwise.
    pub fn close(&mut self, rule: CompletionRule) {
        if !self.emit_if(rule) {
            self.discard();
        }
    }

    /// Drop the accumulator without emitting anything.
    pub fn discard(&mut self) {
        if self.partial.is_open() {
            debug!(partial = ?self.partial, "Dropping incomplete network entry");
            self.stats.record_dropped();
        }
        self.partial = PartialRecord::default();
    }

    /// Start a fresh accumulator seeded with `name`.
    pub fn open(&mut self, name: &str) {
        self.partial = PartialRecord::named(name);
    }

    pub fn set_name(&mut self, name: &str) {
        self.partial.name = Some(name.to_string());
    }

    /// Normalize and store a signal reading. Returns whether the slot was set.
    pub fn set_signal(&mut self, raw: Option<&str>, representation: SignalRepresentation) -> bool {
        let Some(raw) = raw else {
            self.field_missing("signal");
            return false;
        };
        match normalize(raw, representation) {
            Ok(signal) => {
                self.partial.signal_strength = Some(signal);
                true
            }
            Err(e) => {
                debug!("Ignoring signal value: {}", e);
                self.stats.record_field_error();
                false
            }
        }
    }

    /// Parse and store a channel reading. Returns whether the slot was set.
    pub fn set_channel(&mut self, raw: Option<&str>) -> bool {
        let Some(raw) = raw else {
            self.field_missing("channel");
            return false;
        };
        match parse_channel(raw) {
            Ok(channel) => {
                self.partial.channel = Some(channel);
                true
            }
            Err(e) => {
                debug!("Ignoring channel value: {}", e);
                self.stats.record_field_error();
                false
            }
        }
    }

    fn field_missing(&self, field: &'static str) {
        debug!("No {} value on a {} line", field, field);
        self.stats.record_field_error();
    }
}

/// Format-specific behaviour plugged into a [`RecordAssembler`].
///
/// Signal lines are handled identically by every format apart from the
/// representation of the raw token; names and channels are where the
/// record boundaries differ.
pub trait FormatStrategy {
    /// Tag a single report line.
    fn classify<'a>(&self, line: &'a str) -> LineClass<'a>;

    /// How this format expresses signal readings.
    fn representation(&self) -> SignalRepresentation;

    fn on_name(&self, session: &mut Session<'_>, name: &str);

    fn on_channel(&self, session: &mut Session<'_>, raw: Option<&str>);

    /// Called once after the last line.
    fn on_end(&self, session: &mut Session<'_>);
}

/// Format A: `netsh wlan show networks mode=Bssid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetshStrategy;

impl FormatStrategy for NetshStrategy {
    fn classify<'a>(&self, line: &'a str) -> LineClass<'a> {
        classify_netsh(line)
    }

    fn representation(&self) -> SignalRepresentation {
        SignalRepresentation::Percentage
    }

    fn on_name(&self, session: &mut Session<'_>, name: &str) {
        if session.partial().is_open() {
            session.close(CompletionRule::AtLeastThreeFields);
        }
        session.open(name);
    }

    fn on_channel(&self, session: &mut Session<'_>, raw: Option<&str>) {
        session.set_channel(raw);
    }

    fn on_end(&self, session: &mut Session<'_>) {
        if session.partial().is_open() {
            session.close(CompletionRule::AtLeastThreeFields);
        }
    }
}

/// Format B: `iwlist <iface> scan`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IwlistStrategy;

impl FormatStrategy for IwlistStrategy {
    fn classify<'a>(&self, line: &'a str) -> LineClass<'a> {
        classify_iwlist(line)
    }

    fn representation(&self) -> SignalRepresentation {
        SignalRepresentation::DecibelMilliwatt
    }

    fn on_name(&self, session: &mut Session<'_>, name: &str) {
        session.set_name(name);
    }

    fn on_channel(&self, session: &mut Session<'_>, raw: Option<&str>) {
        if session.set_channel(raw) {
            session.emit_if(CompletionRule::ExactlyThreeFields);
        }
    }

    fn on_end(&self, session: &mut Session<'_>) {
        // No trailing flush for iwlist: whatever is still open is dropped.
        session.discard();
    }
}

/// Runs a [`FormatStrategy`] over a sequence of lines.
pub struct RecordAssembler<'s, S> {
    strategy: S,
    session: Session<'s>,
}

impl<'s, S: FormatStrategy> RecordAssembler<'s, S> {
    pub fn new(
        strategy: S,
        stats: &'s ScanStats,
        clock: &'s mut dyn FnMut() -> DateTime<Local>,
    ) -> Self {
        Self {
            strategy,
            session: Session::new(stats, clock),
        }
    }

    /// Classify and apply one report line.
    pub fn feed(&mut self, line: &str) {
        let class = self.strategy.classify(line);
        trace!(class = class.label(), "{}", line.trim());
        self.session.stats.record_line(&class);

        match class {
            LineClass::Name(name) => self.strategy.on_name(&mut self.session, name),
            LineClass::Signal(raw) => {
                let representation = self.strategy.representation();
                self.session.set_signal(raw, representation);
            }
            LineClass::Channel(raw) => self.strategy.on_channel(&mut self.session, raw),
            LineClass::Other => {}
        }
    }

    /// Finish the pass and hand back every emitted record, in order.
    pub fn finish(mut self) -> Vec<NetworkRecord> {
        self.strategy.on_end(&mut self.session);
        self.session.records
    }
}
