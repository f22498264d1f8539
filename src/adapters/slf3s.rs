//! Sensirion SLF3S liquid flow sensor adapter
//!
//! Implements [`FlowSensorPort`] for the SLF3S family (SF06-LF command set)
//! over any `embedded-hal-async` I2C bus. Every 16-bit word the sensor sends
//! is followed by a CRC-8 byte, which is checked before the word is used.

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};

use crate::config::{FlowMedium, FlowSensorConfig};
use crate::domain::calibration::SLF3S_TEMPERATURE_INVERSE_SCALE;
use crate::logging::warn;
use crate::ports::sensor::{FlowSensorPort, ProductIdentifier, SensorError};

/// 16-bit command words
mod cmd {
    pub const START_CONTINUOUS_WATER: u16 = 0x3608;
    pub const START_CONTINUOUS_IPA: u16 = 0x3615;
    pub const STOP_CONTINUOUS: u16 = 0x3FF9;
    pub const READ_PRODUCT_ID_1: u16 = 0x367C;
    pub const READ_PRODUCT_ID_2: u16 = 0xE102;
}

/// Bytes per data word on the wire (2 data + 1 CRC)
const WORD_LEN: usize = 3;

/// Signalling flag: air bubble detected in the flow path
const FLAG_AIR_IN_LINE: u16 = 1 << 0;
/// Signalling flag: flow above the specified range
const FLAG_HIGH_FLOW: u16 = 1 << 1;

/// CRC-8 as used by Sensirion sensors (poly 0x31, init 0xFF)
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Split a CRC-protected buffer into its data words
fn decode_words<const W: usize>(buf: &[u8]) -> Result<[u16; W], SensorError> {
    let mut words = [0u16; W];
    for (word, chunk) in words.iter_mut().zip(buf.chunks_exact(WORD_LEN)) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(SensorError::CrcMismatch);
        }
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(words)
}

/// One full measurement frame
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowMeasurement {
    /// Flow in the calibration's engineering unit
    pub flow: f32,
    /// Liquid temperature in Celsius
    pub temperature_c: f32,
    /// Raw signalling flags
    pub flags: u16,
}

impl FlowMeasurement {
    pub fn air_in_line(&self) -> bool {
        self.flags & FLAG_AIR_IN_LINE != 0
    }

    pub fn high_flow(&self) -> bool {
        self.flags & FLAG_HIGH_FLOW != 0
    }
}

/// SLF3S adapter implementing FlowSensorPort
pub struct Slf3sAdapter<I> {
    i2c: I,
    config: FlowSensorConfig,
    measuring: bool,
}

impl<I: I2c> Slf3sAdapter<I> {
    /// Create a new adapter
    ///
    /// The sensor is idle until `start_continuous_measurement()` is called.
    pub fn new(i2c: I, config: FlowSensorConfig) -> Self {
        Self {
            i2c,
            config,
            measuring: false,
        }
    }

    /// Whether continuous measurement has been started
    pub fn is_measuring(&self) -> bool {
        self.measuring
    }

    /// Read flow, temperature and flags
    pub async fn read_measurement(&mut self) -> Result<FlowMeasurement, SensorError> {
        if !self.measuring {
            return Err(SensorError::NotInitialized);
        }

        let mut buf = [0u8; 3 * WORD_LEN];
        self.i2c
            .read(self.config.address, &mut buf)
            .await
            .map_err(bus_error)?;
        let [flow, temperature, flags] = decode_words::<3>(&buf)?;

        Ok(FlowMeasurement {
            flow: self.config.calibration.ticks_to_flow(flow as i16),
            temperature_c: temperature as i16 as f32 / SLF3S_TEMPERATURE_INVERSE_SCALE,
            flags,
        })
    }

    /// Leave continuous measurement mode
    pub async fn stop_continuous_measurement(&mut self) -> Result<(), SensorError> {
        self.write_command(cmd::STOP_CONTINUOUS).await?;
        self.measuring = false;
        Ok(())
    }

    /// Release the underlying I2C bus
    pub fn release(self) -> I {
        self.i2c
    }

    async fn write_command(&mut self, command: u16) -> Result<(), SensorError> {
        self.i2c
            .write(self.config.address, &command.to_be_bytes())
            .await
            .map_err(bus_error)
    }
}

fn bus_error<E: embedded_hal_async::i2c::Error>(e: E) -> SensorError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => SensorError::NotDetected,
        _ => SensorError::BusError,
    }
}

impl<I: I2c> FlowSensorPort for Slf3sAdapter<I> {
    async fn read_product_identifier(&mut self) -> Result<ProductIdentifier, SensorError> {
        self.write_command(cmd::READ_PRODUCT_ID_1).await?;
        self.write_command(cmd::READ_PRODUCT_ID_2).await?;

        let mut buf = [0u8; 6 * WORD_LEN];
        self.i2c
            .read(self.config.address, &mut buf)
            .await
            .map_err(bus_error)?;
        let w = decode_words::<6>(&buf)?;

        Ok(ProductIdentifier {
            product_number: (w[0] as u32) << 16 | w[1] as u32,
            serial_number: (w[2] as u64) << 48
                | (w[3] as u64) << 32
                | (w[4] as u64) << 16
                | w[5] as u64,
        })
    }

    async fn start_continuous_measurement(&mut self) -> Result<(), SensorError> {
        let command = match self.config.medium {
            FlowMedium::Water => cmd::START_CONTINUOUS_WATER,
            FlowMedium::IsopropylAlcohol => cmd::START_CONTINUOUS_IPA,
        };
        self.write_command(command).await?;
        self.measuring = true;
        Ok(())
    }

    async fn read_flow(&mut self) -> Result<f32, SensorError> {
        let m = self.read_measurement().await?;

        if m.air_in_line() {
            warn!("SLF3S: air in line");
        }
        if m.high_flow() {
            warn!("SLF3S: flow above specified range");
        }

        Ok(m.flow)
    }
}
