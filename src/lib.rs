//! Fluid Bridge - serial command server for analog inputs and a flow sensor
//!
//! A host sends line-oriented text commands (`READ A0`, `PRINT FS`, ...) and
//! the device answers with either a compact binary frame or a text line. The
//! protocol core is `no_std` and hardware-agnostic; RP2350 adapters and the
//! host client sit behind the `rp` and `std` features.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                 │
//! │  - Command parser (Action, Target)                               │
//! │  - Sample / CommandError results                                 │
//! │  - FlowCalibration                                               │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                Protocol / Dispatcher / Server                    │
//! │  - encode / decode of R-frames, P-lines and ERR lines            │
//! │  - Dispatcher: Command -> MeasurementResult                      │
//! │  - CommandServer: one line per scheduler tick                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                               │
//! │  - AnalogPort: A0/A1 samples                                     │
//! │  - FlowSensorPort: flow sensor setup and reads                   │
//! │  - CommunicationPort: host byte stream                           │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                     │
//! │  - Slf3sAdapter: Sensirion SLF3S over async I2C                  │
//! │  - Rp2350AnalogInputs: ADC inputs (rp)                           │
//! │  - UsbCdcAdapter: USB CDC serial (rp)                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the macros are visible to every module below
pub(crate) mod logging;

/// Domain layer - pure command and measurement types
pub mod domain;

/// Ports - traits defining boundaries
pub mod ports;

/// Adapters - concrete implementations
pub mod adapters;

pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod server;

/// Host-side protocol client
#[cfg(feature = "std")]
pub mod host;

// Re-export key domain types
pub use domain::{parse, Action, Command, CommandError, MeasurementResult, Sample, SampleKind, Target};

// Re-export key port traits
pub use ports::{AnalogPort, CommunicationPort, FlowSensorPort};

pub use config::{FlowSensorConfig, ServerConfig};
pub use dispatcher::Dispatcher;
pub use protocol::{decode_frame, decode_reply, encode, Reply, ResponseFrame};
pub use server::{bring_up, CommandServer, TickOutcome};

// Re-export adapters
pub use adapters::Slf3sAdapter;
#[cfg(feature = "rp")]
pub use adapters::{Rp2350AnalogInputs, UsbCdcAdapter};
