//! Host-side client for the command protocol
//!
//! Works over anything that is `Read + Write` (a `serialport` handle in the
//! CLI, an in-memory buffer in tests). Replies are read by marker: `R` frames
//! have a fixed size and may contain `\n` in their payload, everything else
//! is read up to the line terminator.

use std::io::{Read, Write};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, trace};

use crate::domain::{parse, Command, Sample, SampleKind, Target};
use crate::protocol::{decode_reply, Reply, FRAME_MARKER, LINE_TERMINATOR, MAX_RESPONSE_LEN};

/// One row of [`SensorClient::poll_all`], in [`Target::ALL`] order
pub type PollRow = [Reply; 3];

/// Blocking protocol client
pub struct SensorClient<P> {
    port: P,
}

impl<P: Read + Write> SensorClient<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Send a well-formed command and decode its reply
    pub fn request(&mut self, command: Command) -> Result<Reply> {
        let line = command
            .to_line()
            .ok_or_else(|| anyhow!("cannot send {:?}", command))?;
        let kind = command
            .target
            .sample_kind()
            .ok_or_else(|| anyhow!("target {:?} carries no samples", command.target))?;
        self.exchange(line.as_bytes(), kind)
    }

    /// Send a free-form line (shell input) and decode its reply
    ///
    /// The line is classified with the device's own parser to know which
    /// sample width to expect; unknown targets only ever produce error lines.
    pub fn request_raw(&mut self, line: &str) -> Result<Reply> {
        let kind = parse(line)
            .target
            .sample_kind()
            .unwrap_or(SampleKind::Integer);

        let mut bytes = line.trim_end_matches(['\r', '\n']).as_bytes().to_vec();
        bytes.push(LINE_TERMINATOR);
        self.exchange(&bytes, kind)
    }

    /// `READ <target>`, returning the sample or the device's error text
    pub fn read(&mut self, target: Target) -> Result<Sample> {
        expect_sample(self.request(Command::read(target))?)
    }

    /// `PRINT <target>`, returning the sample or the device's error text
    pub fn print(&mut self, target: Target) -> Result<Sample> {
        expect_sample(self.request(Command::print(target))?)
    }

    /// READ every target once
    pub fn poll_all(&mut self) -> Result<PollRow> {
        Ok([
            self.request(Command::read(Target::A0))?,
            self.request(Command::read(Target::A1))?,
            self.request(Command::read(Target::FlowSensor))?,
        ])
    }

    /// Get mutable access to the underlying port
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn exchange(&mut self, line: &[u8], kind: SampleKind) -> Result<Reply> {
        trace!("-> {:?}", String::from_utf8_lossy(line));
        self.port.write_all(line).context("failed to send command")?;
        self.port.flush().context("failed to flush port")?;

        let raw = self.read_reply()?;
        debug!("<- {} bytes", raw.len());

        decode_reply(&raw, kind).map_err(|e| anyhow!("bad reply {:02x?}: {}", raw, e))
    }

    fn read_reply(&mut self) -> Result<Vec<u8>> {
        // Stray terminators (e.g. left over from a previous session) are
        // never the start of a reply
        let mut head = [0u8; 1];
        loop {
            self.port
                .read_exact(&mut head)
                .context("no reply from device")?;
            if head[0] != LINE_TERMINATOR && head[0] != b'\r' {
                break;
            }
            trace!("skipped stray 0x{:02x}", head[0]);
        }
        let mut raw = vec![head[0]];

        if head[0] == FRAME_MARKER {
            let mut length = [0u8; 1];
            self.port
                .read_exact(&mut length)
                .context("frame truncated before length")?;
            raw.push(length[0]);

            // payload + terminator
            let mut rest = vec![0u8; length[0] as usize + 1];
            self.port
                .read_exact(&mut rest)
                .context("frame truncated")?;
            raw.extend_from_slice(&rest);
            return Ok(raw);
        }

        let mut byte = [0u8; 1];
        while raw.last() != Some(&LINE_TERMINATOR) {
            if raw.len() > MAX_RESPONSE_LEN {
                bail!("reply exceeds {} bytes", MAX_RESPONSE_LEN);
            }
            self.port
                .read_exact(&mut byte)
                .context("reply line truncated")?;
            raw.push(byte[0]);
        }
        Ok(raw)
    }
}

fn expect_sample(reply: Reply) -> Result<Sample> {
    match reply {
        Reply::Sample(s) | Reply::Printed(s) => Ok(s),
        Reply::Error(message) => bail!("device error: {}", message),
    }
}

/// Render a reply for a CSV cell; errors become empty cells
pub fn csv_cell(reply: &Reply) -> String {
    match reply {
        Reply::Sample(s) | Reply::Printed(s) => s.to_string(),
        Reply::Error(_) => String::new(),
    }
}

/// Render a reply for the interactive shell
pub fn describe(reply: &Reply) -> String {
    match reply {
        Reply::Sample(s) => format!("frame: {}", s),
        Reply::Printed(s) => format!("text: {}", s),
        Reply::Error(message) => format!("error: {}", message),
    }
}
