/// Sampling and aggregation loop
///
/// The scheduler is the only active driver in the process: every sample
/// tick it polls the three sensors and folds successes into the window
/// accumulator; every report tick it drains the window into an aggregate
/// and hands it to the transmission client. Both timers are polled from
/// one non-blocking loop by comparing elapsed time against their last
/// firing, so a slow bus read delays the cycle but nothing preempts it.
use std::time::Duration;

use log::{debug, error, info, warn};
use time::OffsetDateTime;
use tokio::time::{sleep, Instant};

use crate::ingest::IngestClient;
use crate::models::{AggregateReading, ClimateReading, SampleAccumulator};
use crate::sensors::{ClimateSensor, GasSensor, ParticulateSensor};
use crate::utils::format_datetime;

/// Compensation handed to the gas sensor on ticks where the climate read
/// failed: the datasheet defaults of 25 °C / 50 %RH, in working units.
/// Skipping the gas read instead would put a hole in the index baseline.
const FALLBACK_COMPENSATION: ClimateReading = ClimateReading {
    temperature: 77.0,
    humidity: 50.0,
};

// Timer poll granularity; both intervals are multiples of this
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Scheduler<C, G, P> {
    climate: C,
    gas: G,
    particulates: P,
    accumulator: SampleAccumulator,
}

impl<C, G, P> Scheduler<C, G, P>
where
    C: ClimateSensor,
    G: GasSensor,
    P: ParticulateSensor,
{
    pub fn new(climate: C, gas: G, particulates: P) -> Self {
        Scheduler {
            climate,
            gas,
            particulates,
            accumulator: SampleAccumulator::new(),
        }
    }

    /// One sample tick: attempt all three reads, accumulate successes
    ///
    /// Failures degrade the affected family's count for the window and
    /// nothing else; there is no retry within a tick. The gas read always
    /// receives this tick's climate reading, never a stale one.
    pub fn sample_tick(&mut self) {
        let climate = match self.climate.read() {
            Ok(reading) => {
                debug!(
                    "Climate: {:.2}°F, {:.2}%RH",
                    reading.temperature, reading.humidity
                );
                self.accumulator.record_climate(&reading);
                Some(reading)
            }
            Err(e) => {
                warn!("Climate read failed: {}", e);
                None
            }
        };

        let compensation = climate.unwrap_or(FALLBACK_COMPENSATION);
        match self.gas.read(&compensation) {
            Ok(reading) => {
                debug!("Gas: index {}, raw {}", reading.index, reading.raw);
                self.accumulator.record_gas(&reading);
            }
            Err(e) => warn!("Gas read failed: {}", e),
        }

        match self.particulates.poll() {
            Ok(Some(reading)) => {
                debug!(
                    "Particulates: PM1.0 {} PM2.5 {} PM10 {} µg/m³",
                    reading.pm1_0, reading.pm2_5, reading.pm10
                );
                self.accumulator.record_particulates(&reading);
            }
            Ok(None) => debug!("No particulate frame this tick"),
            Err(e) => warn!("Particulate read failed: {}", e),
        }
    }

    /// One report tick: drain the window, or None if nothing accumulated
    pub fn report_tick(&mut self) -> Option<AggregateReading> {
        self.accumulator.drain()
    }

    #[cfg(test)]
    fn accumulator(&self) -> &SampleAccumulator {
        &self.accumulator
    }

    /// Drive both timers until the task is dropped
    ///
    /// The aggregate is drained (and the accumulator reset) before the
    /// send task is spawned, so a slow or failed POST can neither stall
    /// the sampling cadence nor leak into the next window.
    pub async fn run(
        mut self,
        client: IngestClient,
        sample_every: Duration,
        report_every: Duration,
    ) {
        info!(
            "Starting sampling loop: sample every {:?}, report every {:?}",
            sample_every, report_every
        );

        let mut window_start = OffsetDateTime::now_utc();
        info!(
            "Reporting window started at: {}",
            format_datetime(&window_start)
        );

        let mut last_sample: Option<Instant> = None;
        let mut last_report = Instant::now();

        loop {
            if last_sample.map_or(true, |t| t.elapsed() >= sample_every) {
                self.sample_tick();
                last_sample = Some(Instant::now());
            }

            if last_report.elapsed() >= report_every {
                last_report = Instant::now();
                let window_end = OffsetDateTime::now_utc();

                match self.report_tick() {
                    Some(aggregate) => {
                        info!(
                            "Window complete at: {}",
                            format_datetime(&window_end)
                        );
                        log_summary(&aggregate);

                        let client = client.clone();
                        tokio::spawn(async move {
                            if let Err(e) = client.send(&aggregate).await {
                                // window lost; next one starts fresh
                                error!("Failed to transmit aggregate: {}", e);
                            }
                        });
                    }
                    None => warn!("No data collected during this window!"),
                }

                window_start = window_end;
                debug!(
                    "Next reporting window started at: {}",
                    format_datetime(&window_start)
                );
            }

            sleep(POLL_INTERVAL).await;
        }
    }
}

fn log_summary(aggregate: &AggregateReading) {
    info!("Window summary:");
    info!("  Average temperature: {:.2}°F", aggregate.temperature);
    info!("  Average humidity: {:.2}%", aggregate.humidity);
    info!("  Average VOC index: {}", aggregate.voc_index);
    info!("  Average raw VOC: {}", aggregate.raw_voc);
    info!(
        "  Average PM1.0/PM2.5/PM10: {:.1}/{:.1}/{:.1} µg/m³",
        aggregate.pm1_0, aggregate.pm2_5, aggregate.pm10
    );
    info!(
        "  Samples: climate={}, gas={}, pm={}",
        aggregate.sample_count, aggregate.gas_samples, aggregate.pm_samples
    );
}
