use std::time::Duration;

use crate::audio::{realtime::DEFAULT_ROLLING_BUFFER_SECS, DEFAULT_SAMPLE_RATE};

/// Tunables for a `SessionController`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Period of the elapsed-time tick
    pub tick_interval: Duration,
    /// Length of each rolling buffer in realtime mode
    pub realtime_buffer_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            tick_interval: Duration::from_secs(1),
            realtime_buffer_secs: DEFAULT_ROLLING_BUFFER_SECS,
        }
    }
}
