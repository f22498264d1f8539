//! Runtime configuration for the command server and the flow sensor

use crate::domain::FlowCalibration;

/// Default I2C address of the SLF3S family
pub const SLF3S_DEFAULT_ADDRESS: u8 = 0x08;

/// Configuration for command server pacing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServerConfig {
    /// Pause between scheduler ticks (milliseconds), gives the bus and
    /// sensor time to settle
    pub tick_interval_ms: u64,
    /// How long one receive waits for host bytes before the tick gives up
    /// (milliseconds)
    pub rx_poll_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            rx_poll_ms: 10,
        }
    }
}

/// Liquid the flow sensor is calibrated for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowMedium {
    /// Water calibration
    Water,
    /// Isopropyl alcohol calibration
    IsopropylAlcohol,
}

/// Configuration for the I2C flow sensor
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowSensorConfig {
    /// 7-bit I2C address
    pub address: u8,
    /// Calibration table to measure with
    pub medium: FlowMedium,
    /// Raw tick to flow conversion
    pub calibration: FlowCalibration,
}

impl Default for FlowSensorConfig {
    fn default() -> Self {
        Self {
            address: SLF3S_DEFAULT_ADDRESS,
            medium: FlowMedium::Water,
            calibration: FlowCalibration::SLF3S_1300F,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tick_interval_ms, 100);
        assert_eq!(cfg.rx_poll_ms, 10);
        assert!(cfg.rx_poll_ms < cfg.tick_interval_ms);
    }

    #[test]
    fn test_flow_sensor_defaults() {
        let cfg = FlowSensorConfig::default();
        assert_eq!(cfg.address, 0x08);
        assert_eq!(cfg.medium, FlowMedium::Water);
        assert_eq!(cfg.calibration, FlowCalibration::SLF3S_1300F);
    }
}
