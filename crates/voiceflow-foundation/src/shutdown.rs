//! Process-wide shutdown coordination.
//!
//! Wraps Ctrl-C (and SIGTERM on unix) into a single `wait()` future so the
//! rest of the application doesn't need to know how the signal was raised.
//! Mirrors the `shutdown.wait()` call site the teacher's `main.rs` expects.

use tokio::sync::Notify;
use std::sync::Arc;

pub struct ShutdownHandler {
    notify: Arc<Notify>,
}

pub struct ShutdownHandlerBuilder;

impl ShutdownHandler {
    pub fn new() -> ShutdownHandlerBuilder {
        ShutdownHandlerBuilder
    }

    /// Resolves once a shutdown signal has been observed. Safe to call from
    /// multiple tasks; all callers are woken.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Trigger shutdown programmatically (e.g. on `Quit` command).
    pub fn trigger(&self) {
        self.notify.notify_waiters();
    }

    pub fn handle(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

impl ShutdownHandlerBuilder {
    /// Installs OS signal listeners and returns the handler. Call once,
    /// near the top of `main`.
    pub async fn install(self) -> ShutdownHandler {
        let notify = Arc::new(Notify::new());
        let installed = notify.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
            tracing::info!("Shutdown signal received");
            installed.notify_waiters();
        });
        ShutdownHandler { notify }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_waiters() {
        let notify = Arc::new(Notify::new());
        let handler = ShutdownHandler {
            notify: notify.clone(),
        };
        let waited = tokio::spawn({
            let handler_notify = notify.clone();
            async move {
                let h = ShutdownHandler { notify: handler_notify };
                h.wait().await;
            }
        });
        handler.trigger();
        waited.await.unwrap();
    }
}
