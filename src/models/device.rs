use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    Phone,
    Tablet,
    Laptop,
    Wearable,
    Earbuds,
    Other,
}

impl DeviceType {
    pub const ALL: [DeviceType; 6] = [
        DeviceType::Phone,
        DeviceType::Tablet,
        DeviceType::Laptop,
        DeviceType::Wearable,
        DeviceType::Earbuds,
        DeviceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Phone => "phone",
            DeviceType::Tablet => "tablet",
            DeviceType::Laptop => "laptop",
            DeviceType::Wearable => "wearable",
            DeviceType::Earbuds => "earbuds",
            DeviceType::Other => "other",
        }
    }

    /// Parses a device name; anything unrecognised plays as `Other`.
    pub fn from_name_or_other(name: &str) -> DeviceType {
        name.parse().unwrap_or(DeviceType::Other)
    }

    /// Index into the static per-device lookup tables.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum IntensityLevel {
    Low,
    Medium,
    High,
    Emergency,
    Realtime,
}

const INTENSITY_DURATION_SECS: [f64; 5] = [30.0, 60.0, 120.0, 180.0, 300.0];

impl IntensityLevel {
    pub const PRESETS: [IntensityLevel; 4] = [
        IntensityLevel::Low,
        IntensityLevel::Medium,
        IntensityLevel::High,
        IntensityLevel::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityLevel::Low => "low",
            IntensityLevel::Medium => "medium",
            IntensityLevel::High => "high",
            IntensityLevel::Emergency => "emergency",
            IntensityLevel::Realtime => "realtime",
        }
    }

    /// Planned session length for this level.
    pub fn duration_secs(self) -> f64 {
        INTENSITY_DURATION_SECS[self as usize]
    }

    pub fn is_realtime(self) -> bool {
        self == IntensityLevel::Realtime
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl FromStr for DeviceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        DeviceType::ALL
            .into_iter()
            .find(|device| device.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant {
                kind: "device type",
                value: s.to_string(),
            })
    }
}

impl FromStr for IntensityLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        IntensityLevel::PRESETS
            .into_iter()
            .chain([IntensityLevel::Realtime])
            .find(|level| level.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVariant {
                kind: "intensity level",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied percent/duration pair that replaces the preset intensity for
/// one session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomOverride {
    pub intensity_percent: f64,
    pub duration_secs: f64,
}

impl CustomOverride {
    pub fn new(intensity_percent: f64, duration_secs: f64) -> Self {
        Self {
            intensity_percent,
            duration_secs,
        }
    }

    /// Returns the override with its percent clamped to [0, 100], or
    /// `InvalidOverride` when it cannot be used at all.
    pub fn validate(self) -> Result<Self, EngineError> {
        if !self.intensity_percent.is_finite() {
            return Err(EngineError::InvalidOverride(format!(
                "intensity percent {} is not a number",
                self.intensity_percent
            )));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(EngineError::InvalidOverride(format!(
                "duration {}s must be greater than zero",
                self.duration_secs
            )));
        }

        Ok(Self {
            intensity_percent: self.intensity_percent.clamp(0.0, 100.0),
            duration_secs: self.duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_durations() {
        assert_eq!(IntensityLevel::Low.duration_secs(), 30.0);
        assert_eq!(IntensityLevel::Medium.duration_secs(), 60.0);
        assert_eq!(IntensityLevel::High.duration_secs(), 120.0);
        assert_eq!(IntensityLevel::Emergency.duration_secs(), 180.0);
        assert_eq!(IntensityLevel::Realtime.duration_secs(), 300.0);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Earbuds".parse::<DeviceType>().unwrap(), DeviceType::Earbuds);
        assert_eq!(
            " realtime ".parse::<IntensityLevel>().unwrap(),
            IntensityLevel::Realtime
        );
        let err = "toaster".parse::<DeviceType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown device type 'toaster'");
        assert_eq!(DeviceType::from_name_or_other("toaster"), DeviceType::Other);
        assert_eq!(DeviceType::from_name_or_other(" Tablet"), DeviceType::Tablet);
    }

    #[test]
    fn override_percent_is_clamped() {
        let high = CustomOverride::new(140.0, 45.0).validate().unwrap();
        assert_eq!(high.intensity_percent, 100.0);
        let low = CustomOverride::new(-3.0, 45.0).validate().unwrap();
        assert_eq!(low.intensity_percent, 0.0);
    }

    #[test]
    fn override_rejects_non_positive_duration() {
        for duration in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let result = CustomOverride::new(50.0, duration).validate();
            assert!(matches!(result, Err(EngineError::InvalidOverride(_))));
        }
        assert!(CustomOverride::new(f64::NAN, 30.0).validate().is_err());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&CustomOverride::new(80.0, 90.0)).unwrap();
        assert_eq!(json, r#"{"intensityPercent":80.0,"durationSecs":90.0}"#);
        assert_eq!(serde_json::to_string(&DeviceType::Earbuds).unwrap(), "\"earbuds\"");
    }
}
