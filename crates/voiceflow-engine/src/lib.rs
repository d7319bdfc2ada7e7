//! The VoiceFlow transcription engine: turn aggregation, command matching,
//! dictation emission, and mode control.
//!
//! This crate is the core of the dictation pipeline — everything upstream
//! (audio capture, the streaming transport) and downstream (text injection,
//! hotkey synthesis) is a port this crate calls through a trait object, so
//! the state-machine logic here has no I/O of its own and is driven
//! entirely by [`engine::Engine::run`] pumping a single serialized event
//! queue.

pub mod aggregator;
pub mod commands;
pub mod dictation;
pub mod engine;
pub mod mode;
pub mod model;
pub mod ports;

pub use engine::{Engine, EngineEvent, EngineHandle};
pub use mode::TransitionSource;
pub use model::{
    Action, CommandCategory, CommandDefinition, ConnectionState, Mode, Session, Turn, TurnWord,
    Utterance,
};
pub use ports::{AccessibilityPort, UiEvent, UiPublisher};
