//! In-memory audio output shared by the controller and CLI tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex as StdMutex,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::{
    audio::{AudioOutput, AudioOutputFactory, PcmBuffer, PlaybackEvent},
    error::EngineError,
    models::SessionRecord,
    session::{EngineConfig, SessionController},
    sink::ChannelSink,
};

#[derive(Default)]
pub(crate) struct Recorder {
    scheduled: StdMutex<Vec<(f64, usize)>>,
    opened: AtomicUsize,
    stopped: AtomicUsize,
    events: StdMutex<Option<UnboundedSender<PlaybackEvent>>>,
    /// Number of buffers accepted before `schedule` starts failing.
    fail_after: StdMutex<Option<usize>>,
}

impl Recorder {
    /// Reports the oldest queued buffer as played.
    pub fn finish_buffer(&self) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.send(PlaybackEvent::BufferFinished).unwrap();
        }
    }

    pub fn fail_schedule_after(&self, accepted: usize) {
        *self.fail_after.lock().unwrap() = Some(accepted);
    }

    pub fn scheduled(&self) -> Vec<(f64, usize)> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn last_frequency(&self) -> Option<f64> {
        self.scheduled().last().map(|(hz, _)| *hz)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

struct FakeAudio {
    recorder: Arc<Recorder>,
    fail_open: bool,
}

struct FakeOutput {
    recorder: Arc<Recorder>,
}

impl AudioOutputFactory for FakeAudio {
    fn open(&self, events: UnboundedSender<PlaybackEvent>) -> Result<Box<dyn AudioOutput>, EngineError> {
        if self.fail_open {
            return Err(EngineError::AudioEngineInitFailed("no output device".into()));
        }
        self.recorder.opened.fetch_add(1, Ordering::SeqCst);
        *self.recorder.events.lock().unwrap() = Some(events);
        Ok(Box::new(FakeOutput {
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

impl AudioOutput for FakeOutput {
    fn schedule(&mut self, buffer: PcmBuffer) -> Result<(), EngineError> {
        let mut scheduled = self.recorder.scheduled.lock().unwrap();
        let limit = *self.recorder.fail_after.lock().unwrap();
        if limit.is_some_and(|accepted| scheduled.len() >= accepted) {
            return Err(EngineError::AudioEngineInitFailed("output device lost".into()));
        }
        scheduled.push((buffer.frequency_hz(), buffer.frame_count()));
        Ok(())
    }

    fn stop(&mut self) {
        self.recorder.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn harness(fail_open: bool) -> (SessionController, Arc<Recorder>, UnboundedReceiver<SessionRecord>) {
    let recorder = Arc::new(Recorder::default());
    let (sink, records) = ChannelSink::new();
    let controller = SessionController::new(
        EngineConfig::default(),
        Arc::new(FakeAudio {
            recorder: Arc::clone(&recorder),
            fail_open,
        }),
        Arc::new(sink),
    );
    (controller, recorder, records)
}
