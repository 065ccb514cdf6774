mod bus;
mod checksum;
mod config;
mod gas_index;
mod ingest;
mod models;
mod scheduler;
mod sensors;
mod utils;

use log::{error, info};

use bus::{RpiI2cBus, RpiUart, SystemDelay};
use config::StationConfig;
use ingest::IngestClient;
use scheduler::Scheduler;
use sensors::pms5003::{Pms5003Reader, PMS5003_BAUD};
use sensors::sgp40::Sgp40Reader;
use sensors::sht31::Sht31Reader;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match StationConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!(
        "Bringing up buses: i2c bus {}, serial port {}",
        config.i2c_bus, config.serial_port
    );

    let climate = Sht31Reader::new(RpiI2cBus::new(config.i2c_bus)?, SystemDelay);
    let gas = Sgp40Reader::new(
        RpiI2cBus::new(config.i2c_bus)?,
        SystemDelay,
        config.sample_interval.as_secs_f32(),
    );
    let particulates = Pms5003Reader::new(RpiUart::open(&config.serial_port, PMS5003_BAUD)?);

    let client = IngestClient::new(config.ingest_url.clone(), config.send_timeout)?;
    let scheduler = Scheduler::new(climate, gas, particulates);

    // Handle Ctrl+C gracefully
    let (tx, mut rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        let _ = tx.send(());
    });

    // Run the sampling loop or wait for shutdown signal
    tokio::select! {
        _ = scheduler.run(client, config.sample_interval, config.report_interval) => {
            error!("Sampling loop exited unexpectedly");
        }
        _ = &mut rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
