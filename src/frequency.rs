//! Maps a device and an intensity (or a custom percentage) to a tone frequency.

use crate::models::{DeviceType, IntensityLevel};

/// Base frequency in Hz, indexed by `DeviceType` discriminant.
const BASE_FREQUENCY_HZ: [f64; 6] = [
    165.0, // phone
    220.0, // tablet
    440.0, // laptop
    880.0, // wearable
    660.0, // earbuds
    330.0, // other
];

/// Preset multipliers indexed by `IntensityLevel` discriminant. Realtime has none.
const INTENSITY_MULTIPLIER: [Option<f64>; 5] = [Some(0.8), Some(1.0), Some(1.2), Some(1.5), None];

pub const DEFAULT_REALTIME_PERCENT: f64 = 50.0;
pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 2.0;

pub fn base_frequency(device: DeviceType) -> f64 {
    BASE_FREQUENCY_HZ[device.index()]
}

pub fn preset_multiplier(intensity: IntensityLevel) -> Option<f64> {
    INTENSITY_MULTIPLIER[intensity.index()]
}

/// `0.5 + p/100 * 1.5`, with `p` clamped to [0, 100].
pub fn custom_multiplier(percent: f64) -> f64 {
    let percent = if percent.is_nan() { DEFAULT_REALTIME_PERCENT } else { percent };
    MIN_MULTIPLIER + (percent.clamp(0.0, 100.0) / 100.0) * (MAX_MULTIPLIER - MIN_MULTIPLIER)
}

/// Target frequency in Hz. A supplied percent always wins over the preset
/// multiplier; realtime without a percent uses the realtime default.
pub fn frequency(device: DeviceType, intensity: IntensityLevel, override_percent: Option<f64>) -> f64 {
    let multiplier = match (override_percent, preset_multiplier(intensity)) {
        (Some(percent), _) => custom_multiplier(percent),
        (None, Some(multiplier)) => multiplier,
        (None, None) => custom_multiplier(DEFAULT_REALTIME_PERCENT),
    };
    base_frequency(device) * multiplier
}
