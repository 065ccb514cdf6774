/// Hardware bus abstractions and their Raspberry Pi implementations
///
/// The sensor drivers only ever talk to these traits, so every protocol
/// cycle can be exercised in tests with scripted mock buses and a no-op
/// delay instead of real hardware and real conversion waits.
use std::time::Duration;

use rppal::i2c::I2c;
use rppal::uart::Uart;
use thiserror::Error;

/// Failure of a raw bus transaction, before any protocol interpretation
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus transaction failed: {0}")]
    Transaction(String),
}

/// Command/response bus with addressed peripherals
pub trait I2cBus {
    /// Write all bytes to the peripheral at `addr`, returning the count
    /// actually transferred.
    fn write(&mut self, addr: u16, bytes: &[u8]) -> Result<usize, BusError>;

    /// Read into `buf` from the peripheral at `addr`, returning the count
    /// actually transferred.
    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<usize, BusError>;
}

/// Continuous byte stream source (the particulate sensor's serial line)
pub trait ByteSource {
    /// Read whatever bytes are currently available without blocking.
    /// Returns 0 when the stream has nothing buffered.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BusError>;
}

/// Injectable conversion-delay dependency
///
/// The datasheet-mandated waits between command and response are the only
/// timing inside a sensor read; routing them through a trait lets tests run
/// without sleeping.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Real delay backed by the operating system
pub struct SystemDelay;

impl Delay for SystemDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// I2C bus on the Raspberry Pi
pub struct RpiI2cBus {
    i2c: I2c,
}

impl RpiI2cBus {
    pub fn new(bus: u8) -> Result<Self, BusError> {
        let i2c = I2c::with_bus(bus).map_err(|e| BusError::Transaction(e.to_string()))?;
        Ok(RpiI2cBus { i2c })
    }
}

impl I2cBus for RpiI2cBus {
    fn write(&mut self, addr: u16, bytes: &[u8]) -> Result<usize, BusError> {
        self.i2c
            .set_slave_address(addr)
            .map_err(|e| BusError::Transaction(e.to_string()))?;
        self.i2c
            .write(bytes)
            .map_err(|e| BusError::Transaction(e.to_string()))
    }

    fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<usize, BusError> {
        self.i2c
            .set_slave_address(addr)
            .map_err(|e| BusError::Transaction(e.to_string()))?;
        self.i2c
            .read(buf)
            .map_err(|e| BusError::Transaction(e.to_string()))
    }
}

/// Non-blocking UART on the Raspberry Pi
pub struct RpiUart {
    uart: Uart,
}

impl RpiUart {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, BusError> {
        let mut uart = Uart::with_path(path, baud_rate, rppal::uart::Parity::None, 8, 1)
            .map_err(|e| BusError::Transaction(e.to_string()))?;
        // min_length 0 makes read() return immediately with whatever the
        // line has buffered
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| BusError::Transaction(e.to_string()))?;
        Ok(RpiUart { uart })
    }
}

impl ByteSource for RpiUart {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        self.uart
            .read(buf)
            .map_err(|e| BusError::Transaction(e.to_string()))
    }
}
