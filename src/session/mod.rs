pub mod config;
pub mod controller;
pub mod events;
pub mod state;

pub use config::EngineConfig;
pub use controller::SessionController;
pub use events::SessionEvent;
pub use state::{SessionOutcome, SessionPlan, SessionSnapshot, SessionState, SessionStatus};
