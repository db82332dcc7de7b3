use rodio::source::EmptyCallback;
use rodio::{OutputStream, Sink, Source};
use std::sync::{
    mpsc::{self, Sender},
    Arc,
};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::EngineError;

use super::{AudioOutput, AudioOutputFactory, PcmBuffer, PlaybackEvent};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

enum OutputCommand {
    Schedule(PcmBuffer),
    Stop,
}

/// Plays a shared PCM buffer once.
struct PcmSource {
    samples: Arc<Vec<f32>>,
    position: usize,
    channels: u16,
    sample_rate: u32,
    duration: Duration,
}

impl PcmSource {
    fn new(buffer: &PcmBuffer) -> Self {
        Self {
            samples: buffer.shared_samples(),
            position: 0,
            channels: buffer.channels(),
            sample_rate: buffer.sample_rate(),
            duration: buffer.duration(),
        }
    }
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }
}

impl Source for PcmSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.samples.len() - self.position)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}

/// Opens the default output device on a dedicated thread per session.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutputFactory;

impl AudioOutputFactory for RodioOutputFactory {
    fn open(&self, events: UnboundedSender<PlaybackEvent>) -> Result<Box<dyn AudioOutput>, EngineError> {
        let (tx, rx) = mpsc::channel::<OutputCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        // OutputStream is not Send, so the whole graph lives on this thread
        let worker = thread::Builder::new()
            .name("tone-output".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to create audio output stream: {}", e)));
                        return;
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("Failed to create audio sink: {}", e)));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        OutputCommand::Schedule(buffer) => {
                            sink.append(PcmSource::new(&buffer));
                            let events = events.clone();
                            sink.append(EmptyCallback::<f32>::new(Box::new(move || {
                                let _ = events.send(PlaybackEvent::BufferFinished);
                            })));
                        }
                        OutputCommand::Stop => break,
                    }
                }

                sink.stop();
                log_debug!("Audio output closed");
            })
            .map_err(|e| EngineError::AudioEngineInitFailed(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log_info!("Audio output ready");
                // the worker is detached; it tears the sink down once told to stop
                drop(worker);
                Ok(Box::new(RodioOutput { tx, stopped: false }))
            }
            Ok(Err(message)) => {
                log_error!("{}", message);
                let _ = worker.join();
                Err(EngineError::AudioEngineInitFailed(message))
            }
            Err(_) => {
                let _ = worker.join();
                Err(EngineError::AudioEngineInitFailed(
                    "audio thread exited before signaling readiness".to_string(),
                ))
            }
        }
    }
}

struct RodioOutput {
    tx: Sender<OutputCommand>,
    stopped: bool,
}

impl AudioOutput for RodioOutput {
    fn schedule(&mut self, buffer: PcmBuffer) -> Result<(), EngineError> {
        self.tx
            .send(OutputCommand::Schedule(buffer))
            .map_err(|_| EngineError::AudioEngineInitFailed("audio thread is gone".to_string()))
    }

    /// Signals the worker and returns without waiting for it.
    fn stop(&mut self) {
        if std::mem::replace(&mut self.stopped, true) {
            return;
        }
        let _ = self.tx.send(OutputCommand::Stop);
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
