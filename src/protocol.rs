//! Shared wire protocol for the fluid-bridge command server
//!
//! This module defines the byte-level protocol used between the host tool
//! and the device. It is `no_std` and used on both sides.
//!
//! # Wire format
//!
//! ```text
//! host -> device   "READ A0\n" | "PRINT FS\n" | ...        (ASCII lines)
//! device -> host   ['R'][0x04][4 bytes LE]['\n']            READ success
//!                  "P" decimal "\n"                         PRINT success
//!                  "ERR: " message "\n"                     any failure
//! ```
//!
//! Binary frames carry no type tag: the host knows which numeric type to
//! expect from the target it asked for (see [`Target::sample_kind`]).
//!
//! [`Target::sample_kind`]: crate::domain::Target::sample_kind

use core::fmt::{self, Write as _};

use heapless::{String, Vec};

use crate::domain::{Action, CommandError, MeasurementResult, Sample, SampleKind};

/// Marker byte of a binary READ frame
pub const FRAME_MARKER: u8 = b'R';

/// Marker byte of a PRINT text reply
pub const PRINT_MARKER: u8 = b'P';

/// Prefix of every error line
pub const ERROR_PREFIX: &str = "ERR: ";

/// Line terminator in both directions
pub const LINE_TERMINATOR: u8 = b'\n';

/// Longest command line the device accepts (excluding terminator)
pub const MAX_LINE_LEN: usize = 64;

/// Longest reply the encoder produces
pub const MAX_RESPONSE_LEN: usize = 64;

/// Encoded reply, ready to be written to the serial port
pub type Response = Vec<u8, MAX_RESPONSE_LEN>;

// ============================================================================
// Binary frame
// ============================================================================

/// Binary reply to a successful READ
///
/// Layout: `marker, length, payload[length]`. `length` always equals the
/// width of the sample's numeric type.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponseFrame {
    /// Frame kind (always [`FRAME_MARKER`])
    pub marker: u8,
    /// Tagged payload
    pub sample: Sample,
}

impl ResponseFrame {
    /// Frame for a successful reading
    pub const fn reading(sample: Sample) -> Self {
        Self {
            marker: FRAME_MARKER,
            sample,
        }
    }

    /// Payload length byte
    pub const fn length(&self) -> u8 {
        self.sample.kind().width() as u8
    }

    /// Total bytes on the wire for a frame of `kind`, terminator included
    pub const fn wire_len(kind: SampleKind) -> usize {
        2 + kind.width() + 1
    }

    /// Serialize marker, length, payload and terminator
    pub fn to_bytes(&self) -> [u8; 7] {
        let [b0, b1, b2, b3] = self.sample.to_le_bytes();
        [self.marker, self.length(), b0, b1, b2, b3, LINE_TERMINATOR]
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Encode a measurement result for the requested action
///
/// - READ + sample: binary [`ResponseFrame`]
/// - PRINT + sample: `P<decimal>\n`, floats rounded to two decimals
/// - any error, or an unknown action: `ERR: <message>\n`
///
/// Errors are never framed in binary; the peer always gets a text line.
/// Output depends only on the arguments.
pub fn encode(action: Action, result: &MeasurementResult) -> Response {
    match (action, result) {
        (Action::Read, Ok(sample)) => {
            let mut out = Response::new();
            // 7 bytes always fit
            let _ = out.extend_from_slice(&ResponseFrame::reading(*sample).to_bytes());
            out
        }
        (Action::Print, Ok(sample)) => {
            text_line(format_args!("{}{}\n", PRINT_MARKER as char, sample))
        }
        (Action::Unknown, _) => error_line(CommandError::UnknownCommand, action),
        (_, Err(err)) => error_line(*err, action),
    }
}

/// `ERR: <message>\n` for `err` under `action`
pub fn error_line(err: CommandError, action: Action) -> Response {
    text_line(format_args!("{}{}\n", ERROR_PREFIX, err.message(action)))
}

fn text_line(args: fmt::Arguments<'_>) -> Response {
    let mut line: String<MAX_RESPONSE_LEN> = String::new();
    // MAX_RESPONSE_LEN covers the longest error message and any f32 with
    // two decimals
    let _ = line.write_fmt(args);
    line.into_bytes()
}

// ============================================================================
// Line assembly (device side)
// ============================================================================

/// Result of feeding one byte to a [`LineAssembler`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineEvent<const N: usize> {
    /// A complete line, terminator stripped
    Line(Vec<u8, N>),
    /// A line exceeded `N` bytes and was dropped up to its terminator
    Overflow,
}

/// Accumulates received bytes into `\n`-terminated lines
///
/// Bytes of an over-long line are discarded until the next terminator, at
/// which point a single [`LineEvent::Overflow`] is reported.
#[derive(Debug, Default)]
pub struct LineAssembler<const N: usize> {
    buf: Vec<u8, N>,
    discarding: bool,
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            discarding: false,
        }
    }

    /// Feed one byte; returns an event when a line completes
    pub fn feed(&mut self, byte: u8) -> Option<LineEvent<N>> {
        if byte == LINE_TERMINATOR {
            if self.discarding {
                self.discarding = false;
                return Some(LineEvent::Overflow);
            }
            return Some(LineEvent::Line(core::mem::take(&mut self.buf)));
        }

        if self.discarding {
            return None;
        }

        if self.buf.push(byte).is_err() {
            self.buf.clear();
            self.discarding = true;
        }
        None
    }

    /// Bytes of the line currently being assembled
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

// ============================================================================
// Decoder (host side)
// ============================================================================

/// Longest error text kept by [`Reply::Error`]
pub const MAX_ERROR_TEXT: usize = 64;

/// A decoded device reply
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Binary frame from a READ
    Sample(Sample),
    /// Text value from a PRINT
    Printed(Sample),
    /// `ERR:` line, prefix and terminator stripped
    Error(String<MAX_ERROR_TEXT>),
}

/// Ways a reply can fail to decode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// No bytes at all
    Empty,
    /// First byte is not a known marker
    BadMarker(u8),
    /// Length byte does not match the expected numeric width
    BadLength(u8),
    /// Fewer bytes than the frame header announces
    Truncated,
    /// Reply not terminated by `\n`
    MissingTerminator,
    /// PRINT text is not a number of the expected kind
    BadNumber,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Empty => write!(f, "empty reply"),
            FrameError::BadMarker(b) => write!(f, "unknown reply marker 0x{:02x}", b),
            FrameError::BadLength(n) => write!(f, "unexpected payload length {}", n),
            FrameError::Truncated => write!(f, "truncated frame"),
            FrameError::MissingTerminator => write!(f, "reply not terminated by newline"),
            FrameError::BadNumber => write!(f, "reply is not a valid number"),
        }
    }
}

/// Decode a binary READ frame holding a sample of `kind`
pub fn decode_frame(bytes: &[u8], kind: SampleKind) -> Result<Sample, FrameError> {
    let (&marker, rest) = bytes.split_first().ok_or(FrameError::Empty)?;
    if marker != FRAME_MARKER {
        return Err(FrameError::BadMarker(marker));
    }

    let (&length, rest) = rest.split_first().ok_or(FrameError::Truncated)?;
    if length as usize != kind.width() {
        return Err(FrameError::BadLength(length));
    }

    if rest.len() < kind.width() {
        return Err(FrameError::Truncated);
    }
    let (payload, rest) = rest.split_at(kind.width());
    match rest.first() {
        Some(&LINE_TERMINATOR) => {}
        Some(_) => return Err(FrameError::MissingTerminator),
        None => return Err(FrameError::Truncated),
    }

    let mut raw = [0u8; 4];
    raw.copy_from_slice(payload);
    Ok(Sample::from_le_bytes(kind, raw))
}

/// Decode any reply to a command whose target carries samples of `kind`
pub fn decode_reply(bytes: &[u8], kind: SampleKind) -> Result<Reply, FrameError> {
    match bytes.first() {
        None => Err(FrameError::Empty),
        Some(&FRAME_MARKER) => decode_frame(bytes, kind).map(Reply::Sample),
        Some(&PRINT_MARKER) => {
            let text = text_body(&bytes[1..])?;
            parse_number(text, kind).map(Reply::Printed)
        }
        Some(_) if bytes.starts_with(ERROR_PREFIX.as_bytes()) => {
            let text = text_body(&bytes[ERROR_PREFIX.len()..])?;
            let mut message = String::new();
            for ch in text.chars() {
                if message.push(ch).is_err() {
                    break;
                }
            }
            Ok(Reply::Error(message))
        }
        Some(&other) => Err(FrameError::BadMarker(other)),
    }
}

/// Strip the terminator (and an optional `\r`) from a text reply body
fn text_body(bytes: &[u8]) -> Result<&str, FrameError> {
    let body = bytes
        .strip_suffix(&[LINE_TERMINATOR])
        .ok_or(FrameError::MissingTerminator)?;
    let text = core::str::from_utf8(body).map_err(|_| FrameError::BadNumber)?;
    Ok(text.trim_end_matches('\r'))
}

fn parse_number(text: &str, kind: SampleKind) -> Result<Sample, FrameError> {
    let text = text.trim();
    match kind {
        SampleKind::Integer => text
            .parse::<i32>()
            .map(Sample::Integer)
            .map_err(|_| FrameError::BadNumber),
        SampleKind::Float => text
            .parse::<f32>()
            .map(Sample::Float)
            .map_err(|_| FrameError::BadNumber),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all<const N: usize>(
        asm: &mut LineAssembler<N>,
        bytes: &[u8],
    ) -> heapless::Vec<LineEvent<N>, 8> {
        let mut events = heapless::Vec::new();
        for &b in bytes {
            if let Some(ev) = asm.feed(b) {
                events.push(ev).unwrap();
            }
        }
        events
    }

    #[test]
    fn test_encode_read_integer_frame() {
        let out = encode(Action::Read, &Ok(Sample::Integer(1023)));
        assert_eq!(out.as_slice(), &[0x52, 0x04, 0xFF, 0x03, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_encode_read_float_frame() {
        let out = encode(Action::Read, &Ok(Sample::Float(12.5)));
        let le = 12.5f32.to_le_bytes();
        assert_eq!(out.as_slice(), &[b'R', 4, le[0], le[1], le[2], le[3], b'\n']);
    }

    #[test]
    fn test_encode_print() {
        assert_eq!(encode(Action::Print, &Ok(Sample::Integer(512))).as_slice(), b"P512\n");
        assert_eq!(encode(Action::Print, &Ok(Sample::Integer(-7))).as_slice(), b"P-7\n");
        assert_eq!(encode(Action::Print, &Ok(Sample::Float(1.234))).as_slice(), b"P1.23\n");
    }

    #[test]
    fn test_print_rounds_small_flow_but_read_keeps_it() {
        let fine = Sample::Float(0.004);
        assert_eq!(encode(Action::Print, &Ok(fine)).as_slice(), b"P0.00\n");

        let frame = encode(Action::Read, &Ok(fine));
        assert_eq!(decode_frame(&frame, SampleKind::Float), Ok(fine));
    }

    #[test]
    fn test_encode_errors_are_text_lines() {
        assert_eq!(
            encode(Action::Read, &Err(CommandError::SensorReadFailed)).as_slice(),
            b"ERR: Failed to read flow sensor.\n"
        );
        assert_eq!(
            encode(Action::Unknown, &Err(CommandError::UnknownCommand)).as_slice(),
            b"ERR: Unknown command. Use READ A0, A1, FS.\n"
        );
        assert_eq!(
            encode(Action::Print, &Err(CommandError::InvalidTarget)).as_slice(),
            b"ERR: Unknown command. Use PRINT A0, A1, FS.\n"
        );
        assert_eq!(
            encode(Action::Read, &Err(CommandError::LineTooLong)).as_slice(),
            b"ERR: Line too long.\n"
        );
    }

    #[test]
    fn test_encode_unknown_action_ignores_sample() {
        let out = encode(Action::Unknown, &Ok(Sample::Integer(1)));
        assert!(out.starts_with(b"ERR: "));
    }

    #[test]
    fn test_encode_extreme_float_fits() {
        let out = encode(Action::Print, &Ok(Sample::Float(-f32::MAX)));
        assert_eq!(out.first(), Some(&b'P'));
        assert_eq!(out.last(), Some(&b'\n'));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let result = Ok(Sample::Float(3.75));
        assert_eq!(encode(Action::Read, &result), encode(Action::Read, &result));
        assert_eq!(encode(Action::Print, &result), encode(Action::Print, &result));
    }

    #[test]
    fn test_frame_round_trip() {
        for sample in [Sample::Integer(1023), Sample::Integer(i32::MIN), Sample::Float(-0.125)] {
            let out = encode(Action::Read, &Ok(sample));
            assert_eq!(out.len(), ResponseFrame::wire_len(sample.kind()));
            assert_eq!(decode_frame(&out, sample.kind()), Ok(sample));
        }
    }

    #[test]
    fn test_decode_frame_rejects_malformed() {
        assert_eq!(decode_frame(&[], SampleKind::Integer), Err(FrameError::Empty));
        assert_eq!(decode_frame(b"X", SampleKind::Integer), Err(FrameError::BadMarker(b'X')));
        assert_eq!(decode_frame(&[b'R'], SampleKind::Integer), Err(FrameError::Truncated));
        assert_eq!(
            decode_frame(&[b'R', 2, 0, 0, b'\n'], SampleKind::Integer),
            Err(FrameError::BadLength(2))
        );
        assert_eq!(
            decode_frame(&[b'R', 4, 1, 2], SampleKind::Integer),
            Err(FrameError::Truncated)
        );
        assert_eq!(
            decode_frame(&[b'R', 4, 1, 2, 3, 4, b'x'], SampleKind::Integer),
            Err(FrameError::MissingTerminator)
        );
    }

    #[test]
    fn test_decode_reply_variants() {
        assert_eq!(
            decode_reply(b"P512\n", SampleKind::Integer),
            Ok(Reply::Printed(Sample::Integer(512)))
        );
        assert_eq!(
            decode_reply(b"P1.25\r\n", SampleKind::Float),
            Ok(Reply::Printed(Sample::Float(1.25)))
        );
        assert_eq!(
            decode_reply(b"P1.25\n", SampleKind::Integer),
            Err(FrameError::BadNumber)
        );
        assert_eq!(decode_reply(b"P12", SampleKind::Integer), Err(FrameError::MissingTerminator));

        match decode_reply(b"ERR: Failed to read flow sensor.\n", SampleKind::Float) {
            Ok(Reply::Error(msg)) => assert_eq!(msg.as_str(), "Failed to read flow sensor."),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_line_assembler_splits_lines() {
        let mut asm = LineAssembler::<16>::new();
        let events = feed_all(&mut asm, b"READ A0\nPRINT");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], LineEvent::Line(Vec::from_slice(b"READ A0").unwrap()));
        assert_eq!(asm.pending(), 5);

        let events = feed_all(&mut asm, b" FS\n");
        assert_eq!(events[0], LineEvent::Line(Vec::from_slice(b"PRINT FS").unwrap()));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_line_assembler_overflow_reports_once_then_recovers() {
        let mut asm = LineAssembler::<4>::new();
        let events = feed_all(&mut asm, b"READ A0 TOO LONG\nFS\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], LineEvent::Overflow);
        assert_eq!(events[1], LineEvent::Line(Vec::from_slice(b"FS").unwrap()));
    }

    #[test]
    fn test_line_assembler_exact_capacity_is_not_overflow() {
        let mut asm = LineAssembler::<4>::new();
        let events = feed_all(&mut asm, b"ABCD\n");
        assert_eq!(events[0], LineEvent::Line(Vec::from_slice(b"ABCD").unwrap()));
    }

    #[test]
    fn test_line_assembler_reset_drops_partial_line() {
        let mut asm = LineAssembler::<8>::new();
        feed_all(&mut asm, b"REA");
        asm.reset();
        let events = feed_all(&mut asm, b"READ A1\n");
        assert_eq!(events[0], LineEvent::Line(Vec::from_slice(b"READ A1").unwrap()));
    }
}
