//! Mode Controller (C6): holds the authoritative operating mode and
//! mediates transitions. Transitions are serialized by construction — the
//! controller lives inside the single-writer engine loop and is the only
//! thing that calls `apply`.

use tokio::sync::watch;

use crate::model::Mode;

/// Where a transition request originated, purely for logging/observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    Ui,
    Voice,
    CredentialRejected,
    Quit,
}

pub struct ModeController {
    mode: Mode,
    tx: watch::Sender<Mode>,
}

impl ModeController {
    /// Builds the controller and the `watch::Receiver` side C4/C5 should
    /// hold to read the current mode without locking.
    pub fn new(initial: Mode) -> (Self, watch::Receiver<Mode>) {
        let (tx, rx) = watch::channel(initial);
        (Self { mode: initial, tx }, rx)
    }

    pub fn current(&self) -> Mode {
        self.mode
    }

    /// Applies one transition to completion. Per spec.md §4.6: Dictation
    /// and Wake are lateral (C1/C2 keep running), anything to Off tears
    /// down C1/C2, and Off to either live mode starts them — but that
    /// start/stop orchestration is the caller's job (it owns C1/C2
    /// handles); this just records the new mode and publishes it.
    pub fn apply(&mut self, target: Mode, source: TransitionSource) {
        if self.mode == target {
            return;
        }
        tracing::info!(from = ?self.mode, to = ?target, ?source, "mode transition");
        self.mode = target;
        // A watch channel send only fails if every receiver has dropped,
        // which just means nothing is listening for mode changes anymore.
        let _ = self.tx.send(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_requested_initial_mode() {
        let (controller, rx) = ModeController::new(Mode::Off);
        assert_eq!(controller.current(), Mode::Off);
        assert_eq!(*rx.borrow(), Mode::Off);
    }

    #[test]
    fn apply_updates_current_and_publishes_to_watchers() {
        let (mut controller, rx) = ModeController::new(Mode::Off);
        controller.apply(Mode::Wake, TransitionSource::Ui);
        assert_eq!(controller.current(), Mode::Wake);
        assert_eq!(*rx.borrow(), Mode::Wake);
    }

    #[test]
    fn apply_to_the_same_mode_is_a_no_op() {
        let (mut controller, rx) = ModeController::new(Mode::Dictation);
        controller.apply(Mode::Dictation, TransitionSource::Voice);
        assert_eq!(controller.current(), Mode::Dictation);
        assert!(!rx.has_changed().unwrap_or(false));
    }
}
