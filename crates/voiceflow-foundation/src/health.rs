//! Lightweight periodic health monitor.
//!
//! Components register a name and a closure reporting liveness; the monitor
//! logs a warning when a component stops reporting healthy, which the Mode
//! Controller can use to decide whether to transition to Off (see
//! `EngineError::HealthCheckFailed`).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Default)]
struct HealthState {
    statuses: HashMap<String, bool>,
}

pub struct HealthMonitor {
    interval: Duration,
    state: Arc<RwLock<HealthState>>,
}

impl HealthMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Arc::new(RwLock::new(HealthState::default())),
        }
    }

    pub fn report(&self, component: &str, healthy: bool) {
        self.state
            .write()
            .statuses
            .insert(component.to_string(), healthy);
    }

    pub fn handle(&self) -> HealthHandle {
        HealthHandle {
            state: self.state.clone(),
        }
    }

    /// Spawns the periodic logging task and returns its handle; dropping the
    /// handle does not stop the task (mirrors the teacher's fire-and-forget
    /// `.start()` usage in `main.rs`).
    pub fn start(self) -> JoinHandle<()> {
        let state = self.state.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                for (component, healthy) in state.read().statuses.iter() {
                    if !healthy {
                        tracing::warn!(component, "health check failing");
                    }
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct HealthHandle {
    state: Arc<RwLock<HealthState>>,
}

impl HealthHandle {
    pub fn report(&self, component: &str, healthy: bool) {
        self.state
            .write()
            .statuses
            .insert(component.to_string(), healthy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_roundtrip() {
        let monitor = HealthMonitor::new(Duration::from_secs(60));
        monitor.report("audio", true);
        assert_eq!(monitor.state.read().statuses.get("audio"), Some(&true));
    }
}
