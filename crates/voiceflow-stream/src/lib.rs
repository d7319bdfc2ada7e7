//! Streaming client for the speech-recognition service (C2).
//!
//! Maintains a WebSocket session for the duration of each listening window,
//! sends outbound PCM audio frames, and decodes inbound protocol messages
//! into the [`types::InboundEvent`] stream consumed by the Turn Aggregator.

pub mod client;
pub mod types;
pub mod wire;

pub use client::{ReconnectPolicy, StreamClientConfig};
pub use types::{InboundEvent, TurnWord};
