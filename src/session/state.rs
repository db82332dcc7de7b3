use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::{CustomOverride, DeviceType, IntensityLevel, SessionRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    RunningFixed,
    RunningRealtime,
    Stopped,
    Completed,
}

impl SessionStatus {
    pub fn is_running(self) -> bool {
        matches!(self, SessionStatus::RunningFixed | SessionStatus::RunningRealtime)
    }
}

/// How a running session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Stopped,
    Completed,
}

/// Everything needed to begin a session once audio is playing.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub device: DeviceType,
    pub intensity: IntensityLevel,
    pub custom_override: Option<CustomOverride>,
    pub total_duration_secs: f64,
    pub frequency_hz: f64,
    /// Live percent; only set for realtime sessions.
    pub intensity_percent: Option<f64>,
}

/// Observable view of the engine, published on every state change and tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub is_playing: bool,
    pub elapsed_secs: f64,
    pub total_duration_secs: f64,
    pub remaining_secs: f64,
    /// Only meaningful in realtime mode.
    pub current_frequency_hz: Option<f64>,
    pub intensity_percent: Option<f64>,
    pub current_device: Option<DeviceType>,
    pub current_intensity: Option<IntensityLevel>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Working copy of the record; finalized exactly once.
    pub record: Option<SessionRecord>,
    pub total_duration_secs: f64,
    pub elapsed_secs: f64,
    pub frequency_hz: Option<f64>,
    pub intensity_percent: Option<f64>,
    /// Monotonic start of the running window.
    pub running_anchor: Option<Instant>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.record.as_ref().map(|record| record.id.as_str())
    }

    pub fn is_current(&self, session_id: &str) -> bool {
        self.status.is_running() && self.session_id() == Some(session_id)
    }

    pub fn remaining_secs(&self) -> f64 {
        if self.status.is_running() {
            (self.total_duration_secs - self.current_elapsed_secs()).max(0.0)
        } else {
            0.0
        }
    }

    pub fn current_elapsed_secs(&self) -> f64 {
        match (self.status.is_running(), self.running_anchor) {
            (true, Some(anchor)) => anchor.elapsed().as_secs_f64(),
            _ => self.elapsed_secs,
        }
    }

    pub fn sync_elapsed_from_anchor(&mut self) {
        if self.status.is_running() {
            self.elapsed_secs = self.current_elapsed_secs();
            if let Some(record) = self.record.as_mut() {
                record.duration_secs = self.elapsed_secs.min(self.total_duration_secs);
            }
        }
    }

    pub fn is_expired(&self) -> bool {
        self.status.is_running() && self.elapsed_secs >= self.total_duration_secs
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        plan: &SessionPlan,
        started_at: DateTime<Utc>,
        now: Instant,
    ) {
        let status = if plan.intensity.is_realtime() {
            SessionStatus::RunningRealtime
        } else {
            SessionStatus::RunningFixed
        };

        *self = Self {
            status,
            record: Some(SessionRecord::begin(
                session_id,
                plan.device,
                plan.intensity,
                plan.custom_override,
                started_at,
            )),
            total_duration_secs: plan.total_duration_secs,
            elapsed_secs: 0.0,
            frequency_hz: Some(plan.frequency_hz),
            intensity_percent: plan.intensity_percent,
            running_anchor: Some(now),
        };
    }

    /// Freezes the working record and moves to `Stopped`/`Completed`.
    /// Returns `None` if no session is running.
    pub fn finish(&mut self, outcome: SessionOutcome, ended_at: DateTime<Utc>) -> Option<SessionRecord> {
        if !self.status.is_running() {
            return None;
        }
        self.sync_elapsed_from_anchor();
        self.running_anchor = None;

        let (status, duration_secs, completed) = match outcome {
            SessionOutcome::Stopped => (
                SessionStatus::Stopped,
                self.elapsed_secs.min(self.total_duration_secs),
                false,
            ),
            SessionOutcome::Completed => {
                self.elapsed_secs = self.total_duration_secs;
                (SessionStatus::Completed, self.total_duration_secs, true)
            }
        };
        self.status = status;

        let record = self.record.as_mut().filter(|record| !record.is_finalized())?;
        record.finalize(ended_at, duration_secs, completed);
        Some(record.clone())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let realtime = self.status == SessionStatus::RunningRealtime;
        SessionSnapshot {
            status: self.status,
            session_id: self.session_id().map(str::to_string),
            is_playing: self.status.is_running(),
            elapsed_secs: self.current_elapsed_secs(),
            total_duration_secs: self.total_duration_secs,
            remaining_secs: self.remaining_secs(),
            current_frequency_hz: if realtime { self.frequency_hz } else { None },
            intensity_percent: if realtime { self.intensity_percent } else { None },
            current_device: self.record.as_ref().map(|record| record.device_type),
            current_intensity: self.record.as_ref().map(|record| record.intensity_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn plan(intensity: IntensityLevel) -> SessionPlan {
        SessionPlan {
            device: DeviceType::Phone,
            intensity,
            custom_override: None,
            total_duration_secs: intensity.duration_secs(),
            frequency_hz: 165.0,
            intensity_percent: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_monotonic_anchor() {
        let mut state = SessionState::new();
        state.begin_session("s1".into(), &plan(IntensityLevel::Low), Utc::now(), Instant::now());
        assert_eq!(state.status, SessionStatus::RunningFixed);

        tokio::time::advance(Duration::from_secs(12)).await;
        state.sync_elapsed_from_anchor();
        assert_eq!(state.elapsed_secs, 12.0);
        assert_eq!(state.remaining_secs(), 18.0);
        assert!(!state.is_expired());

        tokio::time::advance(Duration::from_secs(18)).await;
        state.sync_elapsed_from_anchor();
        assert!(state.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_record_carries_elapsed() {
        let mut state = SessionState::new();
        state.begin_session("s1".into(), &plan(IntensityLevel::Medium), Utc::now(), Instant::now());
        tokio::time::advance(Duration::from_secs(7)).await;

        let record = state.finish(SessionOutcome::Stopped, Utc::now()).unwrap();
        assert_eq!(state.status, SessionStatus::Stopped);
        assert_eq!(record.duration_secs, 7.0);
        assert!(!record.is_completed);
        assert!(record.end_time.unwrap() >= record.start_time);
        assert!(record.is_finalized());

        // finalized exactly once
        assert!(state.finish(SessionOutcome::Completed, Utc::now()).is_none());
        state.status = SessionStatus::RunningFixed;
        assert!(state.finish(SessionOutcome::Completed, Utc::now()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn completed_record_carries_planned_duration() {
        let mut state = SessionState::new();
        state.begin_session("s1".into(), &plan(IntensityLevel::High), Utc::now(), Instant::now());
        tokio::time::advance(Duration::from_millis(119_400)).await;

        let record = state.finish(SessionOutcome::Completed, Utc::now()).unwrap();
        assert_eq!(record.duration_secs, 120.0);
        assert!(record.is_completed);
    }

    #[test]
    fn realtime_snapshot_exposes_frequency() {
        let mut state = SessionState::new();
        let mut realtime = plan(IntensityLevel::Realtime);
        realtime.intensity_percent = Some(50.0);
        realtime.frequency_hz = 206.25;
        state.begin_session("s1".into(), &realtime, Utc::now(), Instant::now());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, SessionStatus::RunningRealtime);
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.current_frequency_hz, Some(206.25));
        assert_eq!(snapshot.current_device, Some(DeviceType::Phone));

        state.reset();
        let idle = state.snapshot();
        assert!(!idle.is_playing);
        assert_eq!(idle.current_device, None);
        assert_eq!(idle.session_id, None);
    }
}
