/// SHT31 temperature/humidity driver
///
/// One measurement is a fixed command, a worst-case conversion wait, and a
/// six-byte response where each 16-bit word carries its own CRC-8:
/// T-MSB, T-LSB, T-CRC, H-MSB, H-LSB, H-CRC.
use std::time::Duration;

use crate::bus::{Delay, I2cBus};
use crate::checksum::crc8;
use crate::models::ClimateReading;
use crate::sensors::SensorError;
use crate::utils::celsius_to_fahrenheit;

pub const SHT31_ADDR: u16 = 0x44;

// Single-shot measurement, high repeatability, no clock stretching
const CMD_MEASURE_HIGHREP: [u8; 2] = [0x24, 0x00];
// Worst-case conversion time for high repeatability
const MEASUREMENT_DELAY: Duration = Duration::from_millis(15);
const RESPONSE_LEN: usize = 6;

pub struct Sht31Reader<B, D> {
    bus: B,
    delay: D,
}

impl<B: I2cBus, D: Delay> Sht31Reader<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Sht31Reader { bus, delay }
    }

    /// Run one command/response cycle and convert to physical units
    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let written = self.bus.write(SHT31_ADDR, &CMD_MEASURE_HIGHREP)?;
        if written != CMD_MEASURE_HIGHREP.len() {
            return Err(SensorError::ShortTransfer {
                expected: CMD_MEASURE_HIGHREP.len(),
                got: written,
            });
        }

        self.delay.delay(MEASUREMENT_DELAY);

        let mut response = [0u8; RESPONSE_LEN];
        let got = self.bus.read(SHT31_ADDR, &mut response)?;
        if got != RESPONSE_LEN {
            return Err(SensorError::ShortTransfer {
                expected: RESPONSE_LEN,
                got,
            });
        }

        decode_response(&response)
    }
}

impl<B: I2cBus, D: Delay> super::ClimateSensor for Sht31Reader<B, D> {
    fn read(&mut self) -> Result<ClimateReading, SensorError> {
        Sht31Reader::read(self)
    }
}

/// Validate both word CRCs and map raw ticks onto the datasheet ranges
///
/// Temperature ticks span -45..130 °C, humidity ticks 0..100 %. The
/// returned temperature is converted to Fahrenheit, the payload's working
/// unit.
fn decode_response(response: &[u8; RESPONSE_LEN]) -> Result<ClimateReading, SensorError> {
    check_word(&response[0..2], response[2])?;
    check_word(&response[3..5], response[5])?;

    let raw_temperature = u16::from_be_bytes([response[0], response[1]]);
    let raw_humidity = u16::from_be_bytes([response[3], response[4]]);

    let celsius = -45.0 + 175.0 * raw_temperature as f32 / 65535.0;
    let humidity = 100.0 * raw_humidity as f32 / 65535.0;

    Ok(ClimateReading {
        temperature: celsius_to_fahrenheit(celsius),
        humidity,
    })
}

fn check_word(word: &[u8], received: u8) -> Result<(), SensorError> {
    let computed = crc8(word);
    if computed != received {
        return Err(SensorError::Crc { computed, received });
    }
    Ok(())
}
