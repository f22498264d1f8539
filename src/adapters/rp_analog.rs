//! RP2350 analog input adapter
//!
//! Implements [`AnalogPort`] for the two ADC pins wired to the A0/A1 inputs.
//! Readings are scaled from the 12-bit converter to the 10-bit range
//! (0..=1023) hosts expect.

use crate::logging::warn;
use crate::ports::sensor::{AnalogChannel, AnalogPort};
use embassy_rp::adc::{Adc, Blocking, Channel as AdcChannel};

/// Bits dropped to go from 12-bit ADC counts to 10-bit samples
const SCALE_SHIFT: u16 = 2;

/// RP2350 ADC adapter for the A0/A1 inputs
pub struct Rp2350AnalogInputs<'a> {
    /// ADC peripheral (blocking mode, conversions take a few microseconds)
    adc: Adc<'a, Blocking>,
    a0: AdcChannel<'a>,
    a1: AdcChannel<'a>,
    /// Last good scaled value per channel
    last: [u16; 2],
}

impl<'a> Rp2350AnalogInputs<'a> {
    /// Create the adapter
    ///
    /// * `a0` - ADC channel for input A0 (GPIO26 on the reference board)
    /// * `a1` - ADC channel for input A1 (GPIO27)
    pub fn new(adc: Adc<'a, Blocking>, a0: AdcChannel<'a>, a1: AdcChannel<'a>) -> Self {
        Self {
            adc,
            a0,
            a1,
            last: [0; 2],
        }
    }
}

impl<'a> AnalogPort for Rp2350AnalogInputs<'a> {
    async fn read_analog(&mut self, channel: AnalogChannel) -> i32 {
        let pin = match channel {
            AnalogChannel::A0 => &mut self.a0,
            AnalogChannel::A1 => &mut self.a1,
        };

        // Analog reads have no failure path on the wire; repeat the last value
        let value = match self.adc.blocking_read(pin) {
            Ok(raw) => {
                let scaled = raw >> SCALE_SHIFT;
                self.last[channel as usize] = scaled;
                scaled
            }
            Err(e) => {
                warn!("ADC read on {:?} failed: {:?}", channel, e);
                self.last[channel as usize]
            }
        };

        value as i32
    }
}
