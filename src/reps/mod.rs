pub mod controller;
pub mod state;

pub use controller::{SessionController, SessionEvent, SessionSnapshot, TickReport};
pub use state::{RepCompletion, RepPhase, RepState, DEFAULT_DEBOUNCE_MS};
