use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Peak of the primary tone. Hard ceiling, intentionally not configurable.
const TONE_AMPLITUDE: f64 = 0.3;
/// Slow additive 0.5 Hz component that helps shake liquid loose.
const PULSE_AMPLITUDE: f64 = 0.1;
const PULSE_FREQUENCY_HZ: f64 = 0.5;

/// Mono, 32-bit float PCM. Samples are shared so a buffer can be re-scheduled
/// without copying.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    frequency_hz: f64,
}

impl PcmBuffer {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[cfg(feature = "playback")]
    pub(crate) fn shared_samples(&self) -> Arc<Vec<f32>> {
        Arc::clone(&self.samples)
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len()
    }

    pub fn channels(&self) -> u16 {
        1
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Stateless factory for fixed-length tone buffers.
#[derive(Debug, Clone, Copy)]
pub struct ToneSynthesizer {
    sample_rate: u32,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames for `duration_secs`, or `None` if the request cannot
    /// describe a buffer.
    pub fn frame_count(&self, duration_secs: f64) -> Option<usize> {
        if self.sample_rate == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
            return None;
        }
        let frames = (self.sample_rate as f64 * duration_secs).round();
        if frames < 1.0 || frames > isize::MAX as f64 {
            return None;
        }
        Some(frames as usize)
    }

    pub fn synthesize(&self, frequency_hz: f64, duration_secs: f64) -> Result<PcmBuffer, EngineError> {
        if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
            return Err(EngineError::BufferAllocationFailed(format!(
                "invalid frequency {frequency_hz} Hz"
            )));
        }
        let frames = self.frame_count(duration_secs).ok_or_else(|| {
            EngineError::BufferAllocationFailed(format!(
                "cannot describe {duration_secs}s at {} Hz",
                self.sample_rate
            ))
        })?;

        let mut samples: Vec<f32> = Vec::new();
        samples.try_reserve_exact(frames).map_err(|err| {
            EngineError::BufferAllocationFailed(format!("{frames} frames: {err}"))
        })?;
        samples.extend((0..frames).map(|n| tone_sample(frequency_hz, n, self.sample_rate)));

        Ok(PcmBuffer {
            samples: Arc::new(samples),
            sample_rate: self.sample_rate,
            frequency_hz,
        })
    }
}

/// `0.3 * sin(2π f t) + 0.1 * sin(2π 0.5 t)` with `t = n / sample_rate`.
pub fn tone_sample(frequency_hz: f64, n: usize, sample_rate: u32) -> f32 {
    let t = n as f64 / sample_rate as f64;
    let tone = TONE_AMPLITUDE * (TAU * frequency_hz * t).sin();
    let pulse = PULSE_AMPLITUDE * (TAU * PULSE_FREQUENCY_HZ * t).sin();
    (tone + pulse) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_medium_buffer_length() {
        let buffer = ToneSynthesizer::default().synthesize(165.0, 60.0).unwrap();
        assert_eq!(buffer.frame_count(), 2_646_000);
        assert_eq!(buffer.samples()[0], 0.0);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.duration(), Duration::from_secs(60));
    }

    #[test]
    fn samples_follow_formula() {
        let buffer = ToneSynthesizer::new(48_000).synthesize(440.0, 0.5).unwrap();
        for n in [1usize, 37, 1_000, 23_999] {
            let t = n as f64 / 48_000.0;
            let expected = 0.3 * (TAU * 440.0 * t).sin() + 0.1 * (TAU * 0.5 * t).sin();
            assert!((buffer.samples()[n] as f64 - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn amplitude_stays_under_ceiling() {
        let buffer = ToneSynthesizer::default().synthesize(1320.0, 2.0).unwrap();
        let peak = buffer.samples().iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak <= 0.4 + 1e-6, "peak {peak}");
        assert!(peak > 0.3);
    }

    #[test]
    fn frame_count_rounds() {
        let synth = ToneSynthesizer::new(44_100);
        assert_eq!(synth.frame_count(1.0), Some(44_100));
        assert_eq!(synth.frame_count(0.00001), None);
        assert_eq!(synth.frame_count(0.50002), Some(22_051));
    }

    #[test]
    fn rejects_unusable_requests() {
        let synth = ToneSynthesizer::default();
        assert!(matches!(
            synth.synthesize(0.0, 1.0),
            Err(EngineError::BufferAllocationFailed(_))
        ));
        assert!(synth.synthesize(440.0, 0.0).is_err());
        assert!(synth.synthesize(f64::NAN, 1.0).is_err());
        assert!(ToneSynthesizer::new(0).synthesize(440.0, 1.0).is_err());
    }
}
