//! End-to-end: text line in, bytes out, bytes decoded back on the host side

use embassy_futures::block_on;

use fluid_bridge::ports::{AnalogChannel, ProductIdentifier, SensorError};
use fluid_bridge::protocol::{decode_frame, decode_reply, encode, Reply};
use fluid_bridge::{
    parse, Action, AnalogPort, Command, CommandError, Dispatcher, FlowSensorPort, Sample,
    SampleKind, Target,
};

struct Bench {
    a0: i32,
    a1: i32,
}

impl AnalogPort for Bench {
    async fn read_analog(&mut self, channel: AnalogChannel) -> i32 {
        match channel {
            AnalogChannel::A0 => self.a0,
            AnalogChannel::A1 => self.a1,
        }
    }
}

struct Flow(Result<f32, SensorError>);

impl FlowSensorPort for Flow {
    async fn read_product_identifier(&mut self) -> Result<ProductIdentifier, SensorError> {
        Ok(ProductIdentifier {
            product_number: 0,
            serial_number: 0,
        })
    }

    async fn start_continuous_measurement(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    async fn read_flow(&mut self) -> Result<f32, SensorError> {
        self.0
    }
}

fn dispatcher(flow: Result<f32, SensorError>) -> Dispatcher<Bench, Flow> {
    Dispatcher::new(Bench { a0: 1023, a1: 512 }, Flow(flow))
}

/// parse -> dispatch -> encode
fn run(d: &mut Dispatcher<Bench, Flow>, line: &str) -> Vec<u8> {
    let cmd = parse(line);
    let result = block_on(d.dispatch(cmd));
    encode(cmd.action, &result).to_vec()
}

#[test]
fn read_a0_produces_little_endian_frame() {
    let mut d = dispatcher(Ok(0.0));
    assert_eq!(
        run(&mut d, "READ A0\n"),
        [0x52, 0x04, 0xFF, 0x03, 0x00, 0x00, 0x0A]
    );
}

#[test]
fn print_a1_produces_text_line() {
    let mut d = dispatcher(Ok(0.0));
    assert_eq!(run(&mut d, "PRINT A1"), b"P512\n");
}

#[test]
fn suffix_tolerant_forms_reach_a0() {
    for line in ["READ A0", "  READ A0  ", "READA0"] {
        assert_eq!(parse(line).target, Target::A0, "{:?}", line);
    }
    assert_eq!(parse("PRINT FS"), Command::print(Target::FlowSensor));
}

#[test]
fn unknown_command_is_reported_as_text() {
    let mut d = dispatcher(Ok(0.0));
    let cmd = parse("FOO");
    assert_eq!(cmd.action, Action::Unknown);
    assert_eq!(block_on(d.dispatch(cmd)), Err(CommandError::UnknownCommand));
    assert_eq!(
        run(&mut d, "FOO"),
        b"ERR: Unknown command. Use READ A0, A1, FS.\n"
    );
}

#[test]
fn flow_failure_never_produces_a_frame() {
    let mut d = dispatcher(Err(SensorError::BusError));
    let bytes = run(&mut d, "READ FS");
    assert!(bytes.starts_with(b"ERR: "));
    assert_ne!(bytes[0], b'R');
}

#[test]
fn pipeline_is_deterministic() {
    let lines = ["READ A0", "READ A1", "READ FS", "PRINT A0", "PRINT A1", "PRINT FS", "X"];
    let mut first = dispatcher(Ok(-3.25));
    let mut second = dispatcher(Ok(-3.25));
    for line in lines {
        assert_eq!(run(&mut first, line), run(&mut second, line), "{}", line);
    }
}

#[test]
fn frames_decode_to_the_dispatched_value() {
    let mut d = dispatcher(Ok(12.345));

    let frame = run(&mut d, "READ FS");
    assert_eq!(decode_frame(&frame, SampleKind::Float), Ok(Sample::Float(12.345)));

    let frame = run(&mut d, "READ A1");
    assert_eq!(decode_frame(&frame, SampleKind::Integer), Ok(Sample::Integer(512)));
}

#[test]
fn host_decodes_every_reply_shape() {
    let mut d = dispatcher(Ok(1.5));

    assert_eq!(
        decode_reply(&run(&mut d, "PRINT FS"), SampleKind::Float),
        Ok(Reply::Printed(Sample::Float(1.5)))
    );

    let err = decode_reply(&run(&mut d, "PRINT X"), SampleKind::Integer).unwrap();
    match err {
        Reply::Error(message) => assert_eq!(message.as_str(), "Unknown command. Use PRINT A0, A1, FS."),
        other => panic!("expected error reply, got {:?}", other),
    }
}
