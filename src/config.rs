use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StationConfig {
    pub ingest_url: String,
    pub i2c_bus: u8,
    pub serial_port: String,
    pub sample_interval: Duration,
    pub report_interval: Duration,
    pub send_timeout: Duration,
}

impl StationConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let ingest_url =
            env::var("INGEST_URL").map_err(|_| "INGEST_URL environment variable not set")?;

        let i2c_bus = parse_or_default("I2C_BUS", 1u8)?;
        let serial_port =
            env::var("SERIAL_PORT").unwrap_or_else(|_| "/dev/serial0".to_string());

        let sample_interval =
            Duration::from_secs(parse_or_default("SAMPLE_INTERVAL_SECS", 5u64)?);
        let report_interval =
            Duration::from_secs(parse_or_default("REPORT_INTERVAL_SECS", 60u64)?);
        let send_timeout = Duration::from_secs(parse_or_default("SEND_TIMEOUT_SECS", 10u64)?);

        if sample_interval.is_zero() || report_interval.is_zero() {
            return Err("SAMPLE_INTERVAL_SECS and REPORT_INTERVAL_SECS must be nonzero".into());
        }

        Ok(StationConfig {
            ingest_url,
            i2c_bus,
            serial_port,
            sample_interval,
            report_interval,
            send_timeout,
        })
    }
}

/// Parse an optional environment variable; a present-but-invalid value is
/// an error, not a silent default
fn parse_or_default<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| format!("Invalid {}: {}", name, e).into()),
        Err(_) => Ok(default),
    }
}
