use serde::Serialize;

/// One climate sample from the temperature/humidity sensor
///
/// Temperature is carried in Fahrenheit, the working unit of the
/// transmitted payload. The gas compensation path converts back to Celsius
/// because the sensor protocol wants Celsius ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
}

/// One gas sample: the adaptive index plus the compensated raw ticks it
/// was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasReading {
    pub index: i32,
    pub raw: u16,
}

/// One particulate sample in µg/m³, atmospheric calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticulateReading {
    pub pm1_0: u16,
    pub pm2_5: u16,
    pub pm10: u16,
}

/// Running sums and per-family sample counts for one reporting window
///
/// Exclusively owned by the scheduler. Each `record_*` call adds exactly
/// one sample to its family; `drain` reads the window out and resets every
/// sum and count in one step.
///
/// Counts are tracked per family because the sensors fail independently: a
/// tick that loses the particulate frame still contributes climate and gas
/// samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleAccumulator {
    temperature_sum: f64,
    humidity_sum: f64,
    climate_samples: u32,

    index_sum: i64,
    raw_sum: u64,
    gas_samples: u32,

    pm1_0_sum: u64,
    pm2_5_sum: u64,
    pm10_sum: u64,
    pm_samples: u32,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_climate(&mut self, reading: &ClimateReading) {
        self.temperature_sum += reading.temperature as f64;
        self.humidity_sum += reading.humidity as f64;
        self.climate_samples += 1;
    }

    pub fn record_gas(&mut self, reading: &GasReading) {
        self.index_sum += reading.index as i64;
        self.raw_sum += reading.raw as u64;
        self.gas_samples += 1;
    }

    pub fn record_particulates(&mut self, reading: &ParticulateReading) {
        self.pm1_0_sum += reading.pm1_0 as u64;
        self.pm2_5_sum += reading.pm2_5 as u64;
        self.pm10_sum += reading.pm10 as u64;
        self.pm_samples += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.climate_samples == 0 && self.gas_samples == 0 && self.pm_samples == 0
    }

    /// Drain the window: compute means and reset everything to zero
    ///
    /// Returns None when no family collected a sample. A family that
    /// collected nothing reports zero means; its count stays visible in
    /// the aggregate for the window summary log.
    pub fn drain(&mut self) -> Option<AggregateReading> {
        let window = std::mem::take(self);

        if window.is_empty() {
            return None;
        }

        let climate_mean = |sum: f64| {
            if window.climate_samples == 0 {
                0.0
            } else {
                ((sum / window.climate_samples as f64) * 100.0).round() as f32 / 100.0
            }
        };
        let pm_mean = |sum: u64| {
            if window.pm_samples == 0 {
                0.0
            } else {
                ((sum as f64 / window.pm_samples as f64) * 10.0).round() as f32 / 10.0
            }
        };

        let (voc_index, raw_voc) = if window.gas_samples == 0 {
            (0, 0)
        } else {
            (
                (window.index_sum as f64 / window.gas_samples as f64).round() as i32,
                (window.raw_sum as f64 / window.gas_samples as f64).round() as u16,
            )
        };

        Some(AggregateReading {
            temperature: climate_mean(window.temperature_sum),
            humidity: climate_mean(window.humidity_sum),
            voc_index,
            raw_voc,
            pm1_0: pm_mean(window.pm1_0_sum),
            pm2_5: pm_mean(window.pm2_5_sum),
            pm10: pm_mean(window.pm10_sum),
            sample_count: window.climate_samples,
            gas_samples: window.gas_samples,
            pm_samples: window.pm_samples,
        })
    }
}

/// Window means handed to the transmission client
///
/// Serializes to exactly the ingestion contract: all eight wire fields are
/// mandatory on the endpoint side. `sample_count` carries the climate
/// family count; the other family counts stay local for logging.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReading {
    pub temperature: f32,
    pub humidity: f32,
    pub voc_index: i32,
    pub raw_voc: u16,
    pub pm1_0: f32,
    pub pm2_5: f32,
    pub pm10: f32,
    pub sample_count: u32,
    #[serde(skip_serializing)]
    pub gas_samples: u32,
    #[serde(skip_serializing)]
    pub pm_samples: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_round_trip_means() {
        let mut acc = SampleAccumulator::new();
        for temperature in [68.0, 70.0, 72.0] {
            acc.record_climate(&ClimateReading {
                temperature,
                humidity: 40.0,
            });
        }
        acc.record_gas(&GasReading {
            index: 100,
            raw: 30_000,
        });
        acc.record_gas(&GasReading {
            index: 110,
            raw: 30_100,
        });
        acc.record_particulates(&ParticulateReading {
            pm1_0: 3,
            pm2_5: 9,
            pm10: 12,
        });

        let aggregate = acc.drain().expect("window had samples");
        assert_eq!(aggregate.temperature, 70.0);
        assert_eq!(aggregate.humidity, 40.0);
        assert_eq!(aggregate.sample_count, 3);
        assert_eq!(aggregate.voc_index, 105);
        assert_eq!(aggregate.raw_voc, 30_050);
        assert_eq!(aggregate.gas_samples, 2);
        assert_eq!(aggregate.pm1_0, 3.0);
        assert_eq!(aggregate.pm_samples, 1);
    }

    #[test]
    fn drain_resets_every_sum_and_count() {
        let mut acc = SampleAccumulator::new();
        acc.record_climate(&ClimateReading {
            temperature: 70.0,
            humidity: 50.0,
        });
        acc.record_particulates(&ParticulateReading {
            pm1_0: 1,
            pm2_5: 2,
            pm10: 3,
        });

        assert!(acc.drain().is_some());
        assert_eq!(acc, SampleAccumulator::default());
        assert!(acc.drain().is_none());
    }

    #[test]
    fn empty_window_drains_to_none() {
        let mut acc = SampleAccumulator::new();
        assert!(acc.drain().is_none());
    }

    #[test]
    fn partial_families_report_zero_means() {
        let mut acc = SampleAccumulator::new();
        acc.record_climate(&ClimateReading {
            temperature: 70.0,
            humidity: 50.0,
        });

        let aggregate = acc.drain().unwrap();
        assert_eq!(aggregate.sample_count, 1);
        assert_eq!(aggregate.gas_samples, 0);
        assert_eq!(aggregate.voc_index, 0);
        assert_eq!(aggregate.pm_samples, 0);
        assert_eq!(aggregate.pm2_5, 0.0);
    }

    #[test]
    fn aggregate_serializes_the_full_contract() {
        let aggregate = AggregateReading {
            temperature: 70.25,
            humidity: 41.5,
            voc_index: 103,
            raw_voc: 30_449,
            pm1_0: 2.0,
            pm2_5: 7.5,
            pm10: 11.0,
            sample_count: 12,
            gas_samples: 12,
            pm_samples: 10,
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&aggregate).unwrap()).unwrap();
        for field in [
            "temperature",
            "humidity",
            "voc_index",
            "raw_voc",
            "pm1_0",
            "pm2_5",
            "pm10",
            "sample_count",
        ] {
            assert!(json.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(json["sample_count"], 12);
        // local-only counts must stay off the wire
        assert!(json.get("gas_samples").is_none());
        assert!(json.get("pm_samples").is_none());
    }
}
