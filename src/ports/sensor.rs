//! Sensor ports - abstractions for the measurement sources
//!
//! These traits let the dispatcher query sensors without knowing the
//! specific hardware implementation (RP2350 ADC, Sensirion I2C, mock, etc.)

use core::future::Future;

/// Error type for sensor operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor not initialized (continuous measurement not started)
    NotInitialized,
    /// Sensor not responding on the bus
    NotDetected,
    /// Checksum of a received word did not match
    CrcMismatch,
    /// Bus-level error (NACK, arbitration loss, ...)
    BusError,
}

/// Analog input channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogChannel {
    A0,
    A1,
}

/// Identification data reported by the flow sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProductIdentifier {
    /// Product number (identifies sensor type and range)
    pub product_number: u32,
    /// Unique serial number
    pub serial_number: u64,
}

/// Port for reading the analog inputs
///
/// Reads are assumed to always succeed: there is no fault path for an
/// analog conversion.
///
/// # Example Implementation
///
/// ```ignore
/// struct FixedAnalog(i32);
///
/// impl AnalogPort for FixedAnalog {
///     async fn read_analog(&mut self, _channel: AnalogChannel) -> i32 {
///         self.0
///     }
/// }
/// ```
pub trait AnalogPort {
    /// Sample one channel
    fn read_analog(&mut self, channel: AnalogChannel) -> impl Future<Output = i32>;
}

/// Port for the I2C liquid flow sensor
///
/// `read_product_identifier` and `start_continuous_measurement` are one-time
/// setup calls made before the first command is served.
pub trait FlowSensorPort {
    /// Query the sensor's product and serial number
    fn read_product_identifier(
        &mut self,
    ) -> impl Future<Output = Result<ProductIdentifier, SensorError>>;

    /// Put the sensor into continuous measurement mode
    fn start_continuous_measurement(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Read the latest flow rate
    ///
    /// Failures must be reported, never replaced by a stale or default value.
    fn read_flow(&mut self) -> impl Future<Output = Result<f32, SensorError>>;
}
