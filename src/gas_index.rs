/// Session-long VOC index state
use gas_index_algorithm::{AlgorithmType, GasIndexAlgorithm};

/// Adaptive gas index over raw VOC ticks
///
/// Wraps the Sensirion gas-index algorithm, which models a moving baseline
/// of the sensor's raw response. The internal statistics are only
/// meaningful as a continuous series: construct one instance per device
/// session and feed it every successful raw reading exactly once, in
/// chronological order. Resetting it mid-session corrupts the index.
pub struct VocIndex {
    algorithm: GasIndexAlgorithm,
}

impl VocIndex {
    /// Create the algorithm state for a fixed sampling interval in seconds
    pub fn new(sampling_interval_secs: f32) -> Self {
        VocIndex {
            algorithm: GasIndexAlgorithm::new(AlgorithmType::Voc, sampling_interval_secs),
        }
    }

    /// Fold one raw reading into the moving baseline and return the index
    ///
    /// The index settles around 100 for "typical" air once the baseline
    /// has adapted; the first samples of a session read 0 while the
    /// blackout period elapses.
    pub fn update(&mut self, raw: u16) -> i32 {
        self.algorithm.process(raw as i32)
    }
}
