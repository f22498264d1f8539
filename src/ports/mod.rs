//! Ports (interfaces) defining the boundaries of the application
//!
//! Ports are traits that define how the protocol core interacts with
//! external systems:
//!
//! - **AnalogPort**: how analog inputs are sampled (RP2350 ADC, mock)
//! - **FlowSensorPort**: how the flow sensor is set up and read (SLF3S, mock)
//! - **CommunicationPort**: how bytes reach the host (USB CDC, mock)

pub mod communication;
pub mod sensor;

pub use communication::{CommunicationError, CommunicationPort};
pub use sensor::{AnalogChannel, AnalogPort, FlowSensorPort, ProductIdentifier, SensorError};
