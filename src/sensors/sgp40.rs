/// SGP40 gas driver
///
/// Each measurement is compensated with the climate reading taken the same
/// tick: the command frame carries the humidity and temperature as 16-bit
/// ticks, each word followed by its CRC-8. The raw response feeds the
/// session's adaptive index state, which must see every successful reading
/// exactly once and in order.
use std::time::Duration;

use crate::bus::{Delay, I2cBus};
use crate::checksum::crc8;
use crate::gas_index::VocIndex;
use crate::models::{ClimateReading, GasReading};
use crate::sensors::SensorError;
use crate::utils::fahrenheit_to_celsius;

pub const SGP40_ADDR: u16 = 0x59;

const CMD_MEASURE_RAW: [u8; 2] = [0x26, 0x0F];
// Worst-case raw signal conversion time
const MEASUREMENT_DELAY: Duration = Duration::from_millis(30);
const COMMAND_LEN: usize = 8;
const RESPONSE_LEN: usize = 3;

// Compensation domain; out-of-range inputs clamp to the nearest bound
const HUMIDITY_MIN: f32 = 0.0;
const HUMIDITY_MAX: f32 = 100.0;
const TEMPERATURE_MIN_C: f32 = -45.0;
const TEMPERATURE_MAX_C: f32 = 130.0;

/// Rescale clamped compensation inputs to the sensor's 16-bit tick domain
pub fn compensation_ticks(celsius: f32, humidity: f32) -> (u16, u16) {
    let humidity = humidity.clamp(HUMIDITY_MIN, HUMIDITY_MAX);
    let celsius = celsius.clamp(TEMPERATURE_MIN_C, TEMPERATURE_MAX_C);

    let humidity_ticks = ((humidity / 100.0) * 65535.0) as u16;
    let temperature_ticks = (((celsius + 45.0) / 175.0) * 65535.0) as u16;
    (humidity_ticks, temperature_ticks)
}

/// Assemble the 8-byte measurement command: command word, humidity word +
/// CRC, temperature word + CRC
fn build_command(compensation: &ClimateReading) -> [u8; COMMAND_LEN] {
    let (humidity_ticks, temperature_ticks) = compensation_ticks(
        fahrenheit_to_celsius(compensation.temperature),
        compensation.humidity,
    );
    let humidity = humidity_ticks.to_be_bytes();
    let temperature = temperature_ticks.to_be_bytes();

    [
        CMD_MEASURE_RAW[0],
        CMD_MEASURE_RAW[1],
        humidity[0],
        humidity[1],
        crc8(&humidity),
        temperature[0],
        temperature[1],
        crc8(&temperature),
    ]
}

pub struct Sgp40Reader<B, D> {
    bus: B,
    delay: D,
    voc: VocIndex,
}

impl<B: I2cBus, D: Delay> Sgp40Reader<B, D> {
    /// The reader owns the session's index state; constructing it more
    /// than once per session would restart the baseline.
    pub fn new(bus: B, delay: D, sampling_interval_secs: f32) -> Self {
        Sgp40Reader {
            bus,
            delay,
            voc: VocIndex::new(sampling_interval_secs),
        }
    }

    /// Run one compensated measurement and fold it into the index
    pub fn read(&mut self, compensation: &ClimateReading) -> Result<GasReading, SensorError> {
        let command = build_command(compensation);
        let written = self.bus.write(SGP40_ADDR, &command)?;
        if written != COMMAND_LEN {
            return Err(SensorError::ShortTransfer {
                expected: COMMAND_LEN,
                got: written,
            });
        }

        self.delay.delay(MEASUREMENT_DELAY);

        let mut response = [0u8; RESPONSE_LEN];
        let got = self.bus.read(SGP40_ADDR, &mut response)?;
        if got != RESPONSE_LEN {
            return Err(SensorError::ShortTransfer {
                expected: RESPONSE_LEN,
                got,
            });
        }

        let computed = crc8(&response[0..2]);
        if computed != response[2] {
            return Err(SensorError::Crc {
                computed,
                received: response[2],
            });
        }

        let raw = u16::from_be_bytes([response[0], response[1]]);
        let index = self.voc.update(raw);
        Ok(GasReading { index, raw })
    }
}

impl<B: I2cBus, D: Delay> super::GasSensor for Sgp40Reader<B, D> {
    fn read(&mut self, compensation: &ClimateReading) -> Result<GasReading, SensorError> {
        Sgp40Reader::read(self, compensation)
    }
}
