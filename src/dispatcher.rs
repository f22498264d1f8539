//! Command dispatcher
//!
//! Routes a parsed [`Command`] to the measurement source it names and turns
//! the answer into a [`MeasurementResult`]. No retries, no caching: every
//! command queries its sensor exactly once, or not at all when the command is
//! invalid.

use crate::domain::{Action, Command, CommandError, MeasurementResult, Sample, Target};
use crate::logging::warn;
use crate::ports::{AnalogChannel, AnalogPort, FlowSensorPort};

/// Routes commands to the analog and flow sensor ports
pub struct Dispatcher<A, F> {
    analog: A,
    flow: F,
}

impl<A: AnalogPort, F: FlowSensorPort> Dispatcher<A, F> {
    pub fn new(analog: A, flow: F) -> Self {
        Self { analog, flow }
    }

    /// Query the source selected by `cmd`
    pub async fn dispatch(&mut self, cmd: Command) -> MeasurementResult {
        if cmd.action == Action::Unknown {
            return Err(CommandError::UnknownCommand);
        }

        match cmd.target {
            Target::A0 => Ok(Sample::Integer(self.analog.read_analog(AnalogChannel::A0).await)),
            Target::A1 => Ok(Sample::Integer(self.analog.read_analog(AnalogChannel::A1).await)),
            Target::FlowSensor => match self.flow.read_flow().await {
                Ok(flow) => Ok(Sample::Float(flow)),
                Err(e) => {
                    warn!("Flow sensor read failed: {:?}", e);
                    Err(CommandError::SensorReadFailed)
                }
            },
            Target::Unknown => Err(CommandError::InvalidTarget),
        }
    }

    /// Mutable access to the flow sensor (for one-time setup)
    pub fn flow_mut(&mut self) -> &mut F {
        &mut self.flow
    }

    /// Mutable access to the analog inputs
    pub fn analog_mut(&mut self) -> &mut A {
        &mut self.analog
    }
}
