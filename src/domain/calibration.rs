//! Flow conversion domain service
//!
//! This module converts the raw signed 16-bit flow ticks reported by the
//! SLF3S family into engineering units.

/// Flow conversion parameters
///
/// Converts raw sensor ticks to a flow rate using a linear formula:
/// `flow = raw / inverse_scale + offset`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowCalibration {
    /// Inverse scale factor from the sensor datasheet (ticks per unit)
    pub inverse_scale: f32,
    /// Zero offset in engineering units
    pub offset: f32,
}

impl FlowCalibration {
    /// SLF3S-1300F: 500 ticks per ml/min
    pub const SLF3S_1300F: Self = Self {
        inverse_scale: 500.0,
        offset: 0.0,
    };

    /// SLF3S-0600F: 10 ticks per µl/min
    pub const SLF3S_0600F: Self = Self {
        inverse_scale: 10.0,
        offset: 0.0,
    };

    /// Create a new calibration with custom parameters
    pub const fn new(inverse_scale: f32, offset: f32) -> Self {
        Self {
            inverse_scale,
            offset,
        }
    }

    /// Convert a raw flow word to engineering units
    #[inline]
    pub fn ticks_to_flow(&self, raw: i16) -> f32 {
        raw as f32 / self.inverse_scale + self.offset
    }
}

impl Default for FlowCalibration {
    fn default() -> Self {
        Self::SLF3S_1300F
    }
}

/// Temperature scale shared by the whole SLF3S family (ticks per °C)
pub const SLF3S_TEMPERATURE_INVERSE_SCALE: f32 = 200.0;
