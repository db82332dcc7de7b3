use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CustomOverride, DeviceType, IntensityLevel};

/// Summary of one drying session. The engine owns the working copy while the
/// session runs and hands a finalized clone to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub device_type: DeviceType,
    pub intensity_level: IntensityLevel,
    /// Elapsed seconds for a stopped session, planned seconds for a completed one.
    pub duration_secs: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_completed: bool,
    /// Override that drove frequency and duration, if one was in effect.
    pub custom_override: Option<CustomOverride>,
}

impl SessionRecord {
    pub fn begin(
        id: String,
        device_type: DeviceType,
        intensity_level: IntensityLevel,
        custom_override: Option<CustomOverride>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            device_type,
            intensity_level,
            duration_secs: 0.0,
            start_time,
            end_time: None,
            is_completed: false,
            custom_override,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Freezes the record. `end_time` never precedes `start_time`, even if the
    /// wall clock stepped backwards while the session ran.
    pub(crate) fn finalize(&mut self, end_time: DateTime<Utc>, duration_secs: f64, completed: bool) {
        self.end_time = Some(end_time.max(self.start_time));
        self.duration_secs = duration_secs;
        self.is_completed = completed;
    }
}
