//! Adapters - concrete implementations of ports
//!
//! Adapters connect the domain to the outside world by implementing
//! the port traits. Each adapter knows how to work with a specific
//! technology or hardware.
//!
//! # Available Adapters
//!
//! - **slf3s**: Sensirion SLF3S liquid flow sensor via I2C (any async HAL)
//! - **rp_analog**: RP2350 ADC inputs A0/A1 (`rp` feature)
//! - **usb_cdc**: USB CDC serial communication (`rp` feature)

pub mod slf3s;

#[cfg(feature = "rp")]
pub mod rp_analog;
#[cfg(feature = "rp")]
pub mod usb_cdc;

pub use slf3s::{FlowMeasurement, Slf3sAdapter};

#[cfg(feature = "rp")]
pub use rp_analog::Rp2350AnalogInputs;
#[cfg(feature = "rp")]
pub use usb_cdc::UsbCdcAdapter;
