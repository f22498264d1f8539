//! Command server - one receive-and-serve step per scheduler tick
//!
//! The server owns the communication port, the dispatcher and the line
//! assembler. Each [`CommandServer::tick`] receives at most once and serves at
//! most one line; bytes after that line stay buffered for the next tick. The
//! surrounding firmware loop adds the fixed inter-tick pause.

use crate::dispatcher::Dispatcher;
use crate::domain::{parse, Action, Command, CommandError};
use crate::logging::{debug, info, warn};
use crate::ports::{
    AnalogPort, CommunicationError, CommunicationPort, FlowSensorPort, ProductIdentifier,
    SensorError,
};
use crate::protocol::{encode, error_line, LineAssembler, LineEvent, MAX_LINE_LEN};

/// Bytes pulled from the transport per receive (one USB full-speed packet)
pub const RX_CHUNK_LEN: usize = 64;

/// What a single tick did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// No complete line was available
    Idle,
    /// A line was parsed, dispatched and answered
    Served {
        /// The parsed command
        command: Command,
        /// Whether the reply carried a measurement
        ok: bool,
    },
    /// A line was rejected before parsing
    Rejected(CommandError),
}

/// Sequential command server
pub struct CommandServer<C, A, F> {
    comm: C,
    dispatcher: Dispatcher<A, F>,
    assembler: LineAssembler<MAX_LINE_LEN>,
    rx: [u8; RX_CHUNK_LEN],
    rx_len: usize,
    rx_pos: usize,
}

impl<C, A, F> CommandServer<C, A, F>
where
    C: CommunicationPort,
    A: AnalogPort,
    F: FlowSensorPort,
{
    pub fn new(comm: C, dispatcher: Dispatcher<A, F>) -> Self {
        Self {
            comm,
            dispatcher,
            assembler: LineAssembler::new(),
            rx: [0; RX_CHUNK_LEN],
            rx_len: 0,
            rx_pos: 0,
        }
    }

    /// Run one scheduler tick
    ///
    /// Command-level failures are answered on the wire and reported in the
    /// outcome; only transport failures are returned as errors.
    pub async fn tick(&mut self) -> Result<TickOutcome, CommunicationError> {
        if self.rx_pos >= self.rx_len {
            self.rx_len = self.comm.receive(&mut self.rx).await?;
            self.rx_pos = 0;
        }

        while self.rx_pos < self.rx_len {
            let byte = self.rx[self.rx_pos];
            self.rx_pos += 1;

            match self.assembler.feed(byte) {
                None => continue,
                Some(LineEvent::Line(line)) => {
                    let text = core::str::from_utf8(&line).unwrap_or("");
                    return self.serve(parse(text)).await;
                }
                Some(LineEvent::Overflow) => {
                    warn!("Discarded line longer than {} bytes", MAX_LINE_LEN);
                    self.comm
                        .send(&error_line(CommandError::LineTooLong, Action::Unknown))
                        .await?;
                    return Ok(TickOutcome::Rejected(CommandError::LineTooLong));
                }
            }
        }

        Ok(TickOutcome::Idle)
    }

    async fn serve(&mut self, command: Command) -> Result<TickOutcome, CommunicationError> {
        let result = self.dispatcher.dispatch(command).await;
        let response = encode(command.action, &result);
        self.comm.send(&response).await?;

        debug!("Served {:?} ({} bytes)", command, response.len());

        Ok(TickOutcome::Served {
            command,
            ok: result.is_ok(),
        })
    }

    /// Drop buffered input (e.g. after the host reconnects)
    pub fn reset(&mut self) {
        self.assembler.reset();
        self.rx_len = 0;
        self.rx_pos = 0;
    }

    /// Get the underlying communication port
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Get mutable access to the underlying communication port
    pub fn comm_mut(&mut self) -> &mut C {
        &mut self.comm
    }
}

/// One-time flow sensor setup before the first command is served
///
/// Reads the product identifier, then starts continuous measurement. Any
/// failure is returned; callers treat it as fatal.
pub async fn bring_up<F: FlowSensorPort>(flow: &mut F) -> Result<ProductIdentifier, SensorError> {
    let id = flow.read_product_identifier().await?;
    info!(
        "Flow sensor product 0x{:x}, serial {}",
        id.product_number, id.serial_number
    );

    flow.start_continuous_measurement().await?;
    info!("Flow sensor continuous measurement started");

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{FakeAnalog, FakeFlow};
    use crate::domain::Target;
    use embassy_futures::block_on;
    use std::collections::VecDeque;

    /// In-memory transport: scripted receive chunks, captured writes
    #[derive(Default)]
    struct FakeLink {
        incoming: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
        fail_send: bool,
    }

    impl FakeLink {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                incoming: chunks.iter().map(|c| c.to_vec()).collect(),
                ..Default::default()
            }
        }
    }

    impl CommunicationPort for FakeLink {
        async fn wait_connection(&mut self) {}

        fn is_connected(&self) -> bool {
            true
        }

        async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CommunicationError> {
            match self.incoming.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }

        async fn send(&mut self, bytes: &[u8]) -> Result<(), CommunicationError> {
            if self.fail_send {
                return Err(CommunicationError::SendFailed);
            }
            self.sent.push(bytes.to_vec());
            Ok(())
        }
    }

    fn server(link: FakeLink, flow: FakeFlow) -> CommandServer<FakeLink, FakeAnalog, FakeFlow> {
        let analog = FakeAnalog {
            a0: 1023,
            a1: 512,
            reads: 0,
        };
        CommandServer::new(link, Dispatcher::new(analog, flow))
    }

    #[test]
    fn test_idle_when_nothing_received() {
        let mut s = server(FakeLink::default(), FakeFlow::ok(0.0));
        assert_eq!(block_on(s.tick()), Ok(TickOutcome::Idle));
        assert!(s.comm().sent.is_empty());
    }

    #[test]
    fn test_serves_read_with_binary_frame() {
        let mut s = server(FakeLink::with_chunks(&[b"READ A0\n"]), FakeFlow::ok(0.0));
        let outcome = block_on(s.tick()).unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Served {
                command: Command::read(Target::A0),
                ok: true
            }
        );
        assert_eq!(s.comm().sent[0], [0x52, 0x04, 0xFF, 0x03, 0x00, 0x00, 0x0A]);
    }

    #[test]
    fn test_serves_at_most_one_line_per_tick() {
        let mut s = server(
            FakeLink::with_chunks(&[b"PRINT A1\nFOO\nPRI"]),
            FakeFlow::ok(0.0),
        );

        block_on(s.tick()).unwrap();
        assert_eq!(s.comm().sent.len(), 1);
        assert_eq!(s.comm().sent[0], b"P512\n");

        // Second line comes from the buffered chunk, no new receive needed
        let outcome = block_on(s.tick()).unwrap();
        assert!(matches!(outcome, TickOutcome::Served { ok: false, .. }));
        assert_eq!(s.comm().sent[1], b"ERR: Unknown command. Use READ A0, A1, FS.\n");

        // Partial line stays pending
        assert_eq!(block_on(s.tick()), Ok(TickOutcome::Idle));
        assert_eq!(s.comm().sent.len(), 2);
    }

    #[test]
    fn test_line_split_across_receives() {
        let mut s = server(
            FakeLink::with_chunks(&[b"PRINT", b" FS\r\n"]),
            FakeFlow::ok(2.5),
        );
        assert_eq!(block_on(s.tick()), Ok(TickOutcome::Idle));
        block_on(s.tick()).unwrap();
        assert_eq!(s.comm().sent[0], b"P2.50\n");
    }

    #[test]
    fn test_sensor_failure_answers_with_text_and_keeps_serving() {
        let mut s = server(
            FakeLink::with_chunks(&[b"READ FS\n", b"READ A1\n"]),
            FakeFlow::failing(SensorError::BusError),
        );

        block_on(s.tick()).unwrap();
        assert_eq!(s.comm().sent[0], b"ERR: Failed to read flow sensor.\n");

        block_on(s.tick()).unwrap();
        assert_eq!(s.comm().sent[1][0], b'R');
    }

    #[test]
    fn test_invalid_utf8_line_is_unknown_command() {
        let mut s = server(FakeLink::with_chunks(&[b"READ \xff A0\n"]), FakeFlow::ok(0.0));
        let outcome = block_on(s.tick()).unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Served {
                command: Command::new(Action::Unknown, Target::Unknown),
                ok: false
            }
        );
        assert_eq!(s.comm().sent[0], b"ERR: Unknown command. Use READ A0, A1, FS.\n");
        assert_eq!(s.dispatcher.analog_mut().reads, 0);
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let mut long = [b'X'; MAX_LINE_LEN + 10];
        long[MAX_LINE_LEN + 9] = b'\n';
        let link = FakeLink::with_chunks(&[&long[..RX_CHUNK_LEN], &long[RX_CHUNK_LEN..]]);
        let mut s = server(link, FakeFlow::ok(0.0));

        assert_eq!(block_on(s.tick()), Ok(TickOutcome::Idle));
        assert_eq!(
            block_on(s.tick()),
            Ok(TickOutcome::Rejected(CommandError::LineTooLong))
        );
        assert_eq!(s.comm().sent[0], b"ERR: Line too long.\n");
    }

    #[test]
    fn test_send_failure_propagates() {
        let mut link = FakeLink::with_chunks(&[b"READ A0\n"]);
        link.fail_send = true;
        let mut s = server(link, FakeFlow::ok(0.0));
        assert_eq!(block_on(s.tick()), Err(CommunicationError::SendFailed));
    }

    #[test]
    fn test_reset_drops_partial_input() {
        let mut s = server(
            FakeLink::with_chunks(&[b"READ", b" A0\n", b"READ A1\n"]),
            FakeFlow::ok(0.0),
        );
        block_on(s.tick()).unwrap();
        s.reset();
        // " A0" alone parses as an unknown command
        block_on(s.tick()).unwrap();
        assert!(s.comm().sent[0].starts_with(b"ERR: "));
    }

    #[test]
    fn test_bring_up_reads_id_then_starts() {
        let mut flow = FakeFlow::ok(0.0);
        let id = block_on(bring_up(&mut flow)).unwrap();
        assert_eq!(id.serial_number, 42);
        assert!(flow.started);
    }

    #[test]
    fn test_bring_up_failure_skips_start() {
        let mut flow = FakeFlow::failing(SensorError::NotDetected);
        assert_eq!(block_on(bring_up(&mut flow)), Err(SensorError::NotDetected));
        assert!(!flow.started);
    }
}
