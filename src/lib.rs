pub mod audio;
pub mod cli;
pub mod error;
pub mod frequency;
pub mod models;
pub mod session;
pub mod settings;
pub mod sink;
#[cfg(test)]
mod testing;
mod utils;

pub use audio::{AudioOutput, AudioOutputFactory, PcmBuffer, PlaybackEvent, RealtimeAdjuster, ToneSynthesizer};
pub use error::EngineError;
pub use models::{CustomOverride, DeviceType, IntensityLevel, SessionRecord};
pub use session::{EngineConfig, SessionController, SessionEvent, SessionSnapshot, SessionStatus};
pub use settings::SettingsStore;
pub use sink::{ChannelSink, SessionSink};
