pub mod realtime;
#[cfg(feature = "playback")]
pub mod rodio_output;
pub mod tone;

pub use realtime::RealtimeAdjuster;
#[cfg(feature = "playback")]
pub use rodio_output::RodioOutputFactory;
pub use tone::{PcmBuffer, ToneSynthesizer, DEFAULT_SAMPLE_RATE};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::EngineError;

/// Notifications from the render path back to the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// One scheduled buffer played to its end.
    BufferFinished,
}

/// A live render graph for exactly one session.
pub trait AudioOutput: Send {
    /// Queues `buffer` behind whatever is playing and arranges for one
    /// `PlaybackEvent::BufferFinished` once it has been rendered.
    fn schedule(&mut self, buffer: PcmBuffer) -> Result<(), EngineError>;

    /// Halts playback and releases the device. Safe to call more than once.
    fn stop(&mut self);
}

/// Acquires a fresh `AudioOutput` for every session.
pub trait AudioOutputFactory: Send + Sync {
    fn open(&self, events: UnboundedSender<PlaybackEvent>) -> Result<Box<dyn AudioOutput>, EngineError>;
}
