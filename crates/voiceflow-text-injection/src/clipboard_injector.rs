//! Wayland clipboard-paste backend: sets the clipboard to the injected
//! text, restores the previous contents after a short delay, and relies on
//! the focused application's own paste shortcut (Ctrl+V) — triggered by
//! whichever input-synthesis backend the caller pairs this with. On its
//! own, `inject_text` only manipulates the clipboard; composing it with a
//! paste trigger is `StrategyManager`'s job.

use crate::error::InjectionError;
use crate::outcome::InjectionOutcome;
use crate::probe::BackendId;
use crate::types::InjectionConfig;
use crate::TextInjector;
use async_trait::async_trait;
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::debug;
use wl_clipboard_rs::copy::{MimeType, Options, Source};
use wl_clipboard_rs::paste::{get_contents, ClipboardType, MimeType as PasteMimeType, Seat};

/// Clipboard injector using the native Wayland copy/paste protocol.
pub struct ClipboardInjector {
    config: InjectionConfig,
}

impl ClipboardInjector {
    /// Returns `None` when the environment isn't Wayland — there is no
    /// point registering a backend that can never become available.
    pub fn new(config: InjectionConfig) -> Option<Self> {
        if std::env::var("WAYLAND_DISPLAY").is_err() {
            return None;
        }
        Some(Self { config })
    }
}

#[async_trait]
impl TextInjector for ClipboardInjector {
    fn backend_id(&self) -> BackendId {
        BackendId::ClipboardWayland
    }

    async fn is_available(&self) -> bool {
        std::env::var("WAYLAND_DISPLAY").is_ok()
    }

    async fn inject_text(&self, text: &str) -> Result<InjectionOutcome, InjectionError> {
        let start = Instant::now();

        if text.is_empty() {
            return Ok(InjectionOutcome {
                backend: BackendId::ClipboardWayland,
                latency_ms: 0,
                degraded: false,
            });
        }

        let saved_clipboard = if self.config.restore_clipboard {
            get_contents(ClipboardType::Regular, Seat::Unspecified, PasteMimeType::Text)
                .ok()
                .and_then(|(mut pipe, _mime)| {
                    let mut contents = String::new();
                    pipe.read_to_string(&mut contents).ok().map(|_| contents)
                })
        } else {
            None
        };

        let source = Source::Bytes(text.as_bytes().to_vec().into());
        Options::new()
            .copy(source, MimeType::Text)
            .map_err(|e| InjectionError::Io {
                backend: BackendId::ClipboardWayland,
                msg: format!("clipboard copy failed: {e}"),
            })?;
        debug!("Clipboard set successfully ({} chars)", text.len());

        if let Some(content) = saved_clipboard {
            let delay_ms = 500;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                let src = Source::Bytes(content.as_bytes().to_vec().into());
                if let Err(e) = Options::new().copy(src, MimeType::Text) {
                    tracing::warn!("Failed to restore clipboard: {}", e);
                }
            });
        }

        Ok(InjectionOutcome {
            backend: BackendId::ClipboardWayland,
            latency_ms: start.elapsed().as_millis() as u32,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_text_succeeds_without_touching_clipboard() {
        let config = InjectionConfig::default();
        let Some(injector) = ClipboardInjector::new(config) else {
            // No Wayland display in this test environment; nothing to assert.
            return;
        };
        let outcome = injector.inject_text("").await.unwrap();
        assert_eq!(outcome.latency_ms, 0);
    }

    #[test]
    fn new_returns_none_without_wayland_display() {
        std::env::remove_var("WAYLAND_DISPLAY");
        let config = InjectionConfig::default();
        assert!(ClipboardInjector::new(config).is_none());
    }
}
