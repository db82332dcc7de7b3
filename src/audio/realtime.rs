use crate::error::EngineError;
use crate::frequency::{self, DEFAULT_REALTIME_PERCENT};
use crate::models::{DeviceType, IntensityLevel};

use super::tone::{PcmBuffer, ToneSynthesizer};

pub const DEFAULT_ROLLING_BUFFER_SECS: f64 = 1.0;

/// Feeds short rolling buffers while a realtime session runs. Every frequency
/// goes through the frequency calculator, so the tone stays within
/// [0.5x, 2.0x] of the device base.
#[derive(Debug)]
pub struct RealtimeAdjuster {
    device: DeviceType,
    synthesizer: ToneSynthesizer,
    buffer_secs: f64,
    current_percent: f64,
    current: Option<PcmBuffer>,
    /// Buffer for a requested frequency that has not been handed off yet.
    pending: Option<PcmBuffer>,
}

impl RealtimeAdjuster {
    pub fn new(device: DeviceType, synthesizer: ToneSynthesizer, buffer_secs: f64) -> Self {
        Self {
            device,
            synthesizer,
            buffer_secs,
            current_percent: DEFAULT_REALTIME_PERCENT,
            current: None,
            pending: None,
        }
    }

    pub fn with_percent(mut self, percent: f64) -> Self {
        self.current_percent = clamp_percent(percent);
        self
    }

    pub fn current_percent(&self) -> f64 {
        self.current_percent
    }

    pub fn current_frequency(&self) -> f64 {
        frequency::frequency(self.device, IntensityLevel::Realtime, Some(self.current_percent))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Buffer to open the session with.
    pub fn first_buffer(&mut self) -> Result<PcmBuffer, EngineError> {
        let buffer = self.synthesize_current()?;
        self.pending = None;
        self.current = Some(buffer.clone());
        Ok(buffer)
    }

    /// Records a new live percent and prepares the buffer that will play after
    /// the current one. Returns the new frequency.
    pub fn on_intensity_changed(&mut self, percent: f64) -> Result<f64, EngineError> {
        self.current_percent = clamp_percent(percent);
        self.pending = Some(self.synthesize_current()?);
        Ok(self.current_frequency())
    }

    /// Called when the playing buffer finishes: a requested frequency wins,
    /// otherwise the current buffer loops.
    pub fn next_buffer(&mut self) -> Result<PcmBuffer, EngineError> {
        if let Some(buffer) = self.pending.take() {
            self.current = Some(buffer.clone());
            return Ok(buffer);
        }
        match &self.current {
            Some(buffer) => Ok(buffer.clone()),
            None => self.first_buffer(),
        }
    }

    fn synthesize_current(&self) -> Result<PcmBuffer, EngineError> {
        self.synthesizer
            .synthesize(self.current_frequency(), self.buffer_secs)
    }
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        DEFAULT_REALTIME_PERCENT
    } else {
        percent.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjuster(device: DeviceType) -> RealtimeAdjuster {
        RealtimeAdjuster::new(device, ToneSynthesizer::default(), DEFAULT_ROLLING_BUFFER_SECS)
    }

    #[test]
    fn starts_at_half_intensity() {
        let mut adjuster = adjuster(DeviceType::Phone);
        assert_eq!(adjuster.current_percent(), 50.0);
        let buffer = adjuster.first_buffer().unwrap();
        assert_eq!(buffer.frequency_hz(), 165.0 * 1.25);
        assert_eq!(buffer.frame_count(), 44_100);
    }

    #[test]
    fn change_is_handed_off_on_next_buffer() {
        let mut adjuster = adjuster(DeviceType::Earbuds);
        adjuster.first_buffer().unwrap();

        let hz = adjuster.on_intensity_changed(100.0).unwrap();
        assert_eq!(hz, 1320.0);
        assert!(adjuster.has_pending());

        assert_eq!(adjuster.next_buffer().unwrap().frequency_hz(), 1320.0);
        assert!(!adjuster.has_pending());
        // no further change: the same tone loops
        assert_eq!(adjuster.next_buffer().unwrap().frequency_hz(), 1320.0);
    }

    #[test]
    fn latest_change_wins() {
        let mut adjuster = adjuster(DeviceType::Tablet);
        adjuster.first_buffer().unwrap();
        adjuster.on_intensity_changed(0.0).unwrap();
        adjuster.on_intensity_changed(100.0).unwrap();
        assert_eq!(adjuster.next_buffer().unwrap().frequency_hz(), 440.0);
    }

    #[test]
    fn frequency_stays_within_bounds() {
        let mut adjuster = adjuster(DeviceType::Wearable);
        for percent in [-50.0, 0.0, 42.0, 100.0, 180.0, f64::NAN] {
            let hz = adjuster.on_intensity_changed(percent).unwrap();
            assert!((440.0..=1760.0).contains(&hz), "{percent} -> {hz}");
        }
    }
}
