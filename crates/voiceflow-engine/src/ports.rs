//! External-collaborator ports the engine calls out through, specified here
//! only as trait contracts. `voiceflow-app` wires concrete implementations;
//! the status panel, menu bar, and settings editor themselves are out of
//! scope for this crate.

use async_trait::async_trait;

use crate::model::Mode;

/// Events the engine publishes for the (out-of-scope) status panel and
/// menu-bar UI to subscribe to.
#[derive(Debug, Clone)]
pub enum UiEvent {
    ModeChanged(Mode),
    HypothesisChanged(String),
    UtteranceCompleted(String),
    ConnectionStateChanged(crate::model::ConnectionState),
    Error { kind: String, message: String },
}

/// The UI port (engine → status panel and menu). Implementors must not
/// block the calling engine loop; fire-and-forget into a channel or a
/// non-blocking log call.
pub trait UiPublisher: Send + Sync {
    fn publish(&self, event: UiEvent);
}

/// A publisher that drops every event; used in tests and anywhere the UI
/// port genuinely has no subscriber.
pub struct NullUiPublisher;

impl UiPublisher for NullUiPublisher {
    fn publish(&self, _event: UiEvent) {}
}

/// The accessibility/permission port (engine ↔ OS). The engine refuses to
/// fire hotkeys or inject text while `check` returns false.
#[async_trait]
pub trait AccessibilityPort: Send + Sync {
    /// Non-prompting check of whether the OS has granted the permission
    /// this app needs to synthesize keystrokes / read focus.
    async fn check_accessibility_permission(&self) -> bool;

    /// Triggers the OS's native permission prompt. Implementations may
    /// need a forced re-register step on platforms where the user has
    /// explicitly revoked the permission after first grant; that trick is
    /// the port implementation's responsibility, not the engine's.
    async fn request_accessibility_permission(&self);
}

/// An accessibility port that always reports granted; used in tests and on
/// platforms/backends where the OS has no such gate (e.g. a pure-Wayland
/// portal-based injector that prompts per-call instead of once globally).
pub struct AlwaysGrantedAccessibilityPort;

#[async_trait]
impl AccessibilityPort for AlwaysGrantedAccessibilityPort {
    async fn check_accessibility_permission(&self) -> bool {
        true
    }

    async fn request_accessibility_permission(&self) {}
}
