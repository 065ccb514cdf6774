/// Sensor drivers and the contracts the scheduler polls them through
pub mod pms5003;
pub mod sgp40;
pub mod sht31;

use thiserror::Error;

use crate::bus::BusError;
use crate::models::{ClimateReading, GasReading, ParticulateReading};

pub use pms5003::FrameError;

/// Why a sensor read produced no sample this tick
///
/// Every variant is non-fatal: the scheduler logs it and skips the sensor
/// until the next tick.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("short transfer: expected {expected} bytes, got {got}")]
    ShortTransfer { expected: usize, got: usize },
    #[error("CRC mismatch: computed {computed:#04x}, received {received:#04x}")]
    Crc { computed: u8, received: u8 },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Temperature/humidity source, one command/response cycle per call
pub trait ClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Gas source; compensation must be the reading taken this tick
pub trait GasSensor {
    fn read(&mut self, compensation: &ClimateReading) -> Result<GasReading, SensorError>;
}

/// Particulate source over a free-running frame stream
///
/// `Ok(None)` means the stream has not produced a complete frame since the
/// last poll; the caller simply skips the family this tick.
pub trait ParticulateSensor {
    fn poll(&mut self) -> Result<Option<ParticulateReading>, SensorError>;
}
