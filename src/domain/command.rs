//! Command domain entity and the line parser
//!
//! A command is parsed fresh from every input line and discarded once it has
//! been dispatched. The grammar is a fixed vocabulary: an action prefix
//! (`READ` or `PRINT`) and a two-character target suffix (`A0`, `A1`, `FS`).
//!
//! Target matching is deliberately permissive: the suffix is checked against
//! the whole trimmed line, so `READFS`, `READ FS` and `READ   FS` all select
//! the flow sensor.

use super::measurement::SampleKind;

const READ_PREFIX: &str = "READ";
const PRINT_PREFIX: &str = "PRINT";

/// What the host wants done with the measurement
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Reply with a binary `R` frame
    Read,
    /// Reply with a `P`-prefixed decimal text line
    Print,
    /// Line did not start with a known action
    Unknown,
}

impl Action {
    /// Wire keyword for this action (`None` for [`Action::Unknown`])
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Action::Read => Some(READ_PREFIX),
            Action::Print => Some(PRINT_PREFIX),
            Action::Unknown => None,
        }
    }
}

/// Measurement source selected by a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// Analog input A0
    A0,
    /// Analog input A1
    A1,
    /// I2C liquid flow sensor
    FlowSensor,
    /// Line did not end with a known target
    Unknown,
}

impl Target {
    /// All targets a host can address, in wire order
    pub const ALL: [Target; 3] = [Target::A0, Target::A1, Target::FlowSensor];

    /// Wire suffix for this target (`None` for [`Target::Unknown`])
    pub const fn suffix(self) -> Option<&'static str> {
        match self {
            Target::A0 => Some("A0"),
            Target::A1 => Some("A1"),
            Target::FlowSensor => Some("FS"),
            Target::Unknown => None,
        }
    }

    /// Numeric type a successful reading of this target carries
    ///
    /// Binary frames have no type tag on the wire, so a decoder has to know
    /// what it asked for.
    pub const fn sample_kind(self) -> Option<SampleKind> {
        match self {
            Target::A0 | Target::A1 => Some(SampleKind::Integer),
            Target::FlowSensor => Some(SampleKind::Float),
            Target::Unknown => None,
        }
    }

    /// Resolve a target from the wire suffix, case-insensitively
    ///
    /// Only used for user input on the host; the device side matches
    /// case-sensitively in [`parse`].
    pub fn from_name(name: &str) -> Option<Self> {
        Target::ALL
            .into_iter()
            .find(|t| t.suffix().is_some_and(|s| s.eq_ignore_ascii_case(name.trim())))
    }
}

/// A parsed command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub action: Action,
    pub target: Target,
}

impl Command {
    pub const fn new(action: Action, target: Target) -> Self {
        Self { action, target }
    }

    /// Convenience: `READ <target>`
    pub const fn read(target: Target) -> Self {
        Self::new(Action::Read, target)
    }

    /// Convenience: `PRINT <target>`
    pub const fn print(target: Target) -> Self {
        Self::new(Action::Print, target)
    }

    /// Canonical wire form including the `\n` terminator
    ///
    /// Returns `None` when the action or target is unknown, since there is
    /// nothing meaningful to send.
    pub fn to_line(&self) -> Option<heapless::String<16>> {
        let keyword = self.action.keyword()?;
        let suffix = self.target.suffix()?;

        let mut line = heapless::String::new();
        line.push_str(keyword).ok()?;
        line.push(' ').ok()?;
        line.push_str(suffix).ok()?;
        line.push('\n').ok()?;
        Some(line)
    }
}

/// Parse one input line into a [`Command`]
///
/// Never fails: unrecognised input yields [`Action::Unknown`] and/or
/// [`Target::Unknown`], leaving error reporting to the dispatcher.
pub fn parse(line: &str) -> Command {
    let line = line.trim();

    let action = if line.starts_with(READ_PREFIX) {
        Action::Read
    } else if line.starts_with(PRINT_PREFIX) {
        Action::Print
    } else {
        Action::Unknown
    };

    let target = Target::ALL
        .into_iter()
        .find(|t| t.suffix().is_some_and(|s| line.ends_with(s)))
        .unwrap_or(Target::Unknown);

    Command { action, target }
}
