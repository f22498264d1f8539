//! Domain layer - pure protocol logic independent of infrastructure
//!
//! Commands, measurement results and flow conversion. Nothing in here knows
//! about serial ports, I2C or the ADC.

pub mod calibration;
pub mod command;
pub mod measurement;

pub use calibration::FlowCalibration;
pub use command::{parse, Action, Command, Target};
pub use measurement::{CommandError, MeasurementResult, Sample, SampleKind};
