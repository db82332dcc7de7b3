use serde::Serialize;

use crate::models::SessionRecord;

use super::SessionSnapshot;

/// Published to every subscriber of a `SessionController`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Tick(SessionSnapshot),
    #[serde(rename_all = "camelCase")]
    FrequencyChanged {
        session_id: String,
        frequency_hz: f64,
        intensity_percent: f64,
    },
    SessionFinished(SessionRecord),
    Error { message: String },
}
