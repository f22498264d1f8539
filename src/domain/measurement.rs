//! Measurement result domain types
//!
//! A measurement is produced by the dispatcher for every command and consumed
//! immediately by the encoder. The numeric tag travels with the value so the
//! encoder never has to infer the byte width from the call site.

use core::fmt;

use super::command::Action;

/// A single numeric sample with its type tag
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sample {
    /// Raw analog conversion
    Integer(i32),
    /// Flow rate in the sensor's engineering unit
    Float(f32),
}

impl Sample {
    /// Tag of this sample
    pub const fn kind(&self) -> SampleKind {
        match self {
            Sample::Integer(_) => SampleKind::Integer,
            Sample::Float(_) => SampleKind::Float,
        }
    }

    /// Little-endian bytes of the underlying value
    pub fn to_le_bytes(&self) -> [u8; 4] {
        match self {
            Sample::Integer(v) => v.to_le_bytes(),
            Sample::Float(v) => v.to_le_bytes(),
        }
    }

    /// Rebuild a sample from little-endian bytes and a tag
    pub fn from_le_bytes(kind: SampleKind, bytes: [u8; 4]) -> Self {
        match kind {
            SampleKind::Integer => Sample::Integer(i32::from_le_bytes(bytes)),
            SampleKind::Float => Sample::Float(f32::from_le_bytes(bytes)),
        }
    }

}

impl fmt::Display for Sample {
    /// Decimal text as sent in `PRINT` replies: integers verbatim, floats
    /// with two decimals
    ///
    /// Flows finer than 0.01 (e.g. SLF3S-1300F steps of 0.002 ml/min) round
    /// away in this form; `READ` frames carry the full `f32`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Integer(v) => write!(f, "{}", v),
            Sample::Float(v) => write!(f, "{:.2}", v),
        }
    }
}

/// Numeric type tag of a [`Sample`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleKind {
    /// 4-byte signed integer
    Integer,
    /// 4-byte IEEE-754 float
    Float,
}

impl SampleKind {
    /// Payload width in bytes on the wire
    pub const fn width(self) -> usize {
        match self {
            SampleKind::Integer => core::mem::size_of::<i32>(),
            SampleKind::Float => core::mem::size_of::<f32>(),
        }
    }
}

/// Reasons a command produced no sample
///
/// Every variant is recoverable at the command boundary: the peer gets an
/// `ERR:` line and the next command is served normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Line did not start with a known action
    UnknownCommand,
    /// Known action but no known target suffix
    InvalidTarget,
    /// Flow sensor query failed
    SensorReadFailed,
    /// Line exceeded the receive buffer and was discarded
    LineTooLong,
}

impl CommandError {
    /// Human-readable reason, without the `ERR: ` prefix or terminator
    ///
    /// The usage hint names the action the peer used, so a `PRINT` with a
    /// bad target is answered with the `PRINT` variant.
    pub const fn message(self, action: Action) -> &'static str {
        match (self, action) {
            (CommandError::InvalidTarget, Action::Print) => "Unknown command. Use PRINT A0, A1, FS.",
            (CommandError::UnknownCommand | CommandError::InvalidTarget, _) => {
                "Unknown command. Use READ A0, A1, FS."
            }
            (CommandError::SensorReadFailed, _) => "Failed to read flow sensor.",
            (CommandError::LineTooLong, _) => "Line too long.",
        }
    }
}

/// Outcome of dispatching one command
pub type MeasurementResult = Result<Sample, CommandError>;
