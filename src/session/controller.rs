use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::{broadcast, mpsc::{self, UnboundedReceiver}, Mutex},
    task,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    audio::{AudioOutput, AudioOutputFactory, PcmBuffer, PlaybackEvent, RealtimeAdjuster, ToneSynthesizer},
    error::EngineError,
    frequency::{self, DEFAULT_REALTIME_PERCENT},
    models::{CustomOverride, DeviceType, IntensityLevel, SessionRecord},
    sink::SessionSink,
};

use super::{EngineConfig, SessionEvent, SessionOutcome, SessionPlan, SessionSnapshot, SessionState, SessionStatus};

// Set to true to enable lifecycle logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct EngineInner {
    state: SessionState,
    output: Option<Box<dyn AudioOutput>>,
    adjuster: Option<RealtimeAdjuster>,
    /// Cancels the ticker and playback listener of the running session.
    cancel_token: Option<CancellationToken>,
}

/// Drives one drying session at a time. Every operation and background
/// callback runs under the same lock, so lifecycle transitions and buffer
/// handoff never interleave.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Mutex<EngineInner>>,
    audio: Arc<dyn AudioOutputFactory>,
    sink: Arc<dyn SessionSink>,
    events: broadcast::Sender<SessionEvent>,
    config: EngineConfig,
    synthesizer: ToneSynthesizer,
}

impl SessionController {
    pub fn new(config: EngineConfig, audio: Arc<dyn AudioOutputFactory>, sink: Arc<dyn SessionSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(Mutex::new(EngineInner {
                state: SessionState::new(),
                output: None,
                adjuster: None,
                cancel_token: None,
            })),
            audio,
            sink,
            events,
            synthesizer: ToneSynthesizer::new(config.sample_rate),
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.state.snapshot()
    }

    pub async fn is_playing(&self) -> bool {
        self.inner.lock().await.state.status.is_running()
    }

    pub async fn start(
        &self,
        device: DeviceType,
        intensity: IntensityLevel,
        custom_override: Option<CustomOverride>,
    ) -> Result<SessionSnapshot, EngineError> {
        let mut inner = self.inner.lock().await;
        if inner.state.status != SessionStatus::Idle {
            return Err(EngineError::AlreadyRunning);
        }

        let plan = resolve_plan(device, intensity, custom_override);
        let (playback_tx, playback_rx) = mpsc::unbounded_channel();

        let mut output = match self.open_output(playback_tx).await {
            Ok(output) => output,
            Err(err) => return Err(self.abort_start(err)),
        };

        let first = self.first_buffer(&plan).await.and_then(|(buffer, mut adjuster)| {
            output.schedule(buffer)?;
            // realtime keeps one rolling buffer queued behind the playing one
            if let Some(adjuster) = adjuster.as_mut() {
                output.schedule(adjuster.next_buffer()?)?;
            }
            Ok(adjuster)
        });
        let adjuster = match first {
            Ok(adjuster) => adjuster,
            Err(err) => {
                output.stop();
                return Err(self.abort_start(err));
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let cancel_token = CancellationToken::new();

        inner
            .state
            .begin_session(session_id.clone(), &plan, Utc::now(), Instant::now());
        inner.output = Some(output);
        inner.adjuster = adjuster;
        inner.cancel_token = Some(cancel_token.clone());

        self.spawn_ticker(session_id.clone(), cancel_token.clone());
        self.spawn_playback_listener(session_id.clone(), playback_rx, cancel_token);

        log_info!(
            "Session {} started: {} at {} ({:.1} Hz for {:.0}s)",
            session_id,
            plan.device,
            plan.intensity,
            plan.frequency_hz,
            plan.total_duration_secs
        );

        let snapshot = inner.state.snapshot();
        self.publish(SessionEvent::StateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// Ends the running session early. `None` when nothing is running.
    pub async fn stop(&self) -> Option<SessionRecord> {
        let mut inner = self.inner.lock().await;
        if !inner.state.status.is_running() {
            log_debug!("stop() ignored: no running session");
            return None;
        }
        self.finish_locked(&mut inner, SessionOutcome::Stopped)
    }

    /// Ends the running session as completed. `None` when nothing is running.
    pub async fn complete(&self) -> Option<SessionRecord> {
        let mut inner = self.inner.lock().await;
        if !inner.state.status.is_running() {
            return None;
        }
        self.finish_locked(&mut inner, SessionOutcome::Completed)
    }

    /// Advances elapsed time; completes the session once the planned duration
    /// has passed, returning its record.
    pub async fn tick(&self) -> Option<SessionRecord> {
        let mut inner = self.inner.lock().await;
        if !inner.state.status.is_running() {
            return None;
        }
        self.tick_locked(&mut inner)
    }

    /// Applies a live intensity in realtime mode and returns the new
    /// frequency. Ignored (`Ok(None)`) in any other state.
    pub async fn on_intensity_changed(&self, percent: f64) -> Result<Option<f64>, EngineError> {
        let mut guard = self.inner.lock().await;
        if guard.state.status != SessionStatus::RunningRealtime {
            log_debug!("intensity change ignored outside realtime mode");
            return Ok(None);
        }

        let inner = &mut *guard;
        let Some(adjuster) = inner.adjuster.as_mut() else {
            return Ok(None);
        };
        let changed = adjuster
            .on_intensity_changed(percent)
            .map(|hz| (hz, adjuster.current_percent()));

        match changed {
            Ok((frequency_hz, intensity_percent)) => {
                inner.state.frequency_hz = Some(frequency_hz);
                inner.state.intensity_percent = Some(intensity_percent);
                if let Some(session_id) = inner.state.session_id() {
                    self.publish(SessionEvent::FrequencyChanged {
                        session_id: session_id.to_string(),
                        frequency_hz,
                        intensity_percent,
                    });
                }
                Ok(Some(frequency_hz))
            }
            Err(err) => {
                self.fail_locked(inner, err.clone());
                Err(err)
            }
        }
    }

    async fn open_output(
        &self,
        playback_tx: mpsc::UnboundedSender<PlaybackEvent>,
    ) -> Result<Box<dyn AudioOutput>, EngineError> {
        let audio = Arc::clone(&self.audio);
        match task::spawn_blocking(move || audio.open(playback_tx)).await {
            Ok(result) => result,
            Err(err) => Err(EngineError::AudioEngineInitFailed(err.to_string())),
        }
    }

    async fn first_buffer(
        &self,
        plan: &SessionPlan,
    ) -> Result<(PcmBuffer, Option<RealtimeAdjuster>), EngineError> {
        if plan.intensity.is_realtime() {
            let mut adjuster = RealtimeAdjuster::new(
                plan.device,
                self.synthesizer,
                self.config.realtime_buffer_secs,
            )
            .with_percent(plan.intensity_percent.unwrap_or(DEFAULT_REALTIME_PERCENT));
            let buffer = adjuster.first_buffer()?;
            return Ok((buffer, Some(adjuster)));
        }

        let synthesizer = self.synthesizer;
        let (frequency_hz, duration_secs) = (plan.frequency_hz, plan.total_duration_secs);
        let buffer = task::spawn_blocking(move || synthesizer.synthesize(frequency_hz, duration_secs))
            .await
            .map_err(|err| EngineError::BufferAllocationFailed(err.to_string()))??;
        Ok((buffer, None))
    }

    fn abort_start(&self, err: EngineError) -> EngineError {
        log_error!("Session failed to start: {}", err);
        self.publish(SessionEvent::Error {
            message: err.to_string(),
        });
        err
    }

    fn tick_locked(&self, inner: &mut EngineInner) -> Option<SessionRecord> {
        inner.state.sync_elapsed_from_anchor();
        self.publish(SessionEvent::Tick(inner.state.snapshot()));

        if inner.state.is_expired() {
            return self.finish_locked(inner, SessionOutcome::Completed);
        }
        None
    }

    async fn tick_session(&self, session_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_current(session_id) {
            return false;
        }
        self.tick_locked(&mut inner).is_none()
    }

    async fn on_buffer_finished(&self, session_id: &str) {
        let mut guard = self.inner.lock().await;
        if !guard.state.is_current(session_id) {
            return;
        }

        let inner = &mut *guard;
        match inner.state.status {
            SessionStatus::RunningFixed => {
                log_info!("Playback finished for session {}", session_id);
                self.finish_locked(inner, SessionOutcome::Completed);
            }
            SessionStatus::RunningRealtime => {
                let handoff = match (inner.adjuster.as_mut(), inner.output.as_mut()) {
                    (Some(adjuster), Some(output)) => {
                        if adjuster.has_pending() {
                            log_debug!("Handing off {:.1} Hz", adjuster.current_frequency());
                        }
                        adjuster
                            .next_buffer()
                            .and_then(|buffer| output.schedule(buffer))
                    }
                    _ => Ok(()),
                };
                if let Err(err) = handoff {
                    self.fail_locked(inner, err);
                }
            }
            _ => {}
        }
    }

    fn fail_locked(&self, inner: &mut EngineInner, err: EngineError) {
        log_error!("Aborting session: {}", err);
        self.publish(SessionEvent::Error {
            message: err.to_string(),
        });
        self.finish_locked(inner, SessionOutcome::Stopped);
    }

    /// Tears down audio and timers, freezes the record, returns to idle and
    /// only then hands the record to the sink.
    fn finish_locked(&self, inner: &mut EngineInner, outcome: SessionOutcome) -> Option<SessionRecord> {
        if !inner.state.status.is_running() {
            return None;
        }

        if let Some(token) = inner.cancel_token.take() {
            token.cancel();
        }
        if let Some(mut output) = inner.output.take() {
            output.stop();
        }
        inner.adjuster = None;

        let record = inner.state.finish(outcome, Utc::now())?;
        self.publish(SessionEvent::StateChanged(inner.state.snapshot()));
        inner.state.reset();
        self.publish(SessionEvent::StateChanged(inner.state.snapshot()));

        match outcome {
            SessionOutcome::Completed => log_info!(
                "Session {} completed ({:.0}s)",
                record.id,
                record.duration_secs
            ),
            SessionOutcome::Stopped => log_info!(
                "Session {} stopped after {:.1}s",
                record.id,
                record.duration_secs
            ),
        }

        self.sink.record(&record);
        self.publish(SessionEvent::SessionFinished(record.clone()));
        Some(record)
    }

    fn spawn_ticker(&self, session_id: String, cancel_token: CancellationToken) {
        let controller = self.clone();
        let tick_interval = self.config.tick_interval;
        let first_tick = Instant::now() + tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = interval.tick() => {
                        if !controller.tick_session(&session_id).await {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn spawn_playback_listener(
        &self,
        session_id: String,
        mut playback_rx: UnboundedReceiver<PlaybackEvent>,
        cancel_token: CancellationToken,
    ) {
        let controller = self.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    event = playback_rx.recv() => match event {
                        Some(PlaybackEvent::BufferFinished) => {
                            controller.on_buffer_finished(&session_id).await;
                        }
                        None => break,
                    },
                }
            }
        });
    }

    fn publish(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Resolves effective duration and frequency. An override that fails
/// validation is dropped in favour of the preset.
pub fn resolve_plan(
    device: DeviceType,
    intensity: IntensityLevel,
    custom_override: Option<CustomOverride>,
) -> SessionPlan {
    let custom_override = custom_override.and_then(|custom| match custom.validate() {
        Ok(valid) => Some(valid),
        Err(err) => {
            log_warn!("Ignoring custom override: {}", err);
            None
        }
    });

    let total_duration_secs = custom_override
        .map(|custom| custom.duration_secs)
        .unwrap_or_else(|| intensity.duration_secs());
    let override_percent = custom_override.map(|custom| custom.intensity_percent);
    let intensity_percent = intensity
        .is_realtime()
        .then(|| override_percent.unwrap_or(DEFAULT_REALTIME_PERCENT));

    SessionPlan {
        device,
        intensity,
        custom_override,
        total_duration_secs,
        frequency_hz: frequency::frequency(device, intensity, intensity_percent.or(override_percent)),
        intensity_percent,
    }
}
