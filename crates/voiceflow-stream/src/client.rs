//! WebSocket client for the speech-service streaming protocol (C2).
//!
//! Owns connection lifecycle, audio framing, the idle heartbeat, and
//! reconnect backoff. Decoded inbound events are forwarded to the caller
//! (the Turn Aggregator) over an mpsc channel; raw PCM frames arrive the
//! same way from the Audio Source.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use voiceflow_foundation::clock::SharedClock;
use voiceflow_foundation::error::TransportError;

use crate::types::InboundEvent;
use crate::wire::{self, ServerMessage};

/// Exponential backoff with jitter, resetting after a session survives
/// `stable_after` without dropping. Mirrors the retry-cooldown shape used
/// elsewhere in the app (injection backend cooldowns): level doubles the
/// delay each failure, capped, and a healthy run forgives it.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: f64,
    pub stable_after: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: 0.2,
            stable_after: Duration::from_secs(30),
        }
    }
}

struct BackoffState {
    level: u32,
    connected_at: Option<std::time::Instant>,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            level: 0,
            connected_at: None,
        }
    }

    fn on_connected(&mut self, clock: &SharedClock) {
        self.connected_at = Some(clock.now());
    }

    /// Called once a connection attempt fails or a previously-open session
    /// drops. Returns the delay to wait before the next attempt and bumps
    /// (or resets) the backoff level.
    fn on_disconnected(&mut self, policy: &ReconnectPolicy, clock: &SharedClock) -> Duration {
        if let Some(connected_at) = self.connected_at.take() {
            if clock.now().duration_since(connected_at) >= policy.stable_after {
                self.level = 0;
            }
        }
        let delay = self.delay_for_level(policy);
        self.level = (self.level + 1).min(32);
        delay
    }

    fn delay_for_level(&self, policy: &ReconnectPolicy) -> Duration {
        let base = policy.initial.as_secs_f64() * policy.factor.powi(self.level as i32);
        let base = base.min(policy.max.as_secs_f64());
        let jitter_span = base * policy.jitter;
        let jittered = if jitter_span > 0.0 {
            let offset = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
            (base + offset).max(0.0)
        } else {
            base
        };
        Duration::from_secs_f64(jittered)
    }
}

#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub endpoint: String,
    pub sample_rate_hz: u32,
    pub connect_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            endpoint: wire::DEFAULT_ENDPOINT.to_string(),
            sample_rate_hz: 16_000,
            connect_timeout: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(20),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Drives the connect / stream / reconnect loop until `shutdown` reports
/// true. Each iteration is one connection attempt; `api_key` is read fresh
/// every attempt so a settings-port credential rotation takes effect on
/// the next reconnect without restarting the caller.
pub async fn run(
    config: StreamClientConfig,
    api_key: impl Fn() -> String + Send + Sync + 'static,
    mut audio_rx: mpsc::Receiver<Vec<i16>>,
    event_tx: mpsc::Sender<InboundEvent>,
    clock: SharedClock,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = BackoffState::new();

    loop {
        if *shutdown.borrow() {
            return;
        }

        match connect_once(
            &config,
            api_key(),
            &mut audio_rx,
            &event_tx,
            &clock,
            &mut shutdown,
            &mut backoff,
        )
        .await
        {
            Ok(()) => {
                // Graceful close (Off transition or service termination).
                if *shutdown.borrow() {
                    return;
                }
                let delay = backoff.on_disconnected(&config.reconnect, &clock);
                tracing::info!("stream session ended; reconnecting in {:?}", delay);
                wait_or_shutdown(delay, &mut shutdown).await;
            }
            Err(TransportError::CredentialRejected) => {
                tracing::error!("speech service rejected credentials; not retrying");
                let _ = event_tx
                    .send(InboundEvent::Error {
                        code: Some("credential_rejected".to_string()),
                        message: "authentication failed".to_string(),
                    })
                    .await;
                return;
            }
            Err(err) => {
                let delay = backoff.on_disconnected(&config.reconnect, &clock);
                tracing::warn!("stream connection failed: {err}; retrying in {:?}", delay);
                wait_or_shutdown(delay, &mut shutdown).await;
            }
        }
    }
}

async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.changed() => {}
    }
}

/// Runs one connection from handshake to close. Returns `Ok(())` on a
/// graceful close (peer termination or caller shutdown) and `Err` on any
/// failure that should trigger reconnect/backoff.
async fn connect_once(
    config: &StreamClientConfig,
    api_key: String,
    audio_rx: &mut mpsc::Receiver<Vec<i16>>,
    event_tx: &mpsc::Sender<InboundEvent>,
    clock: &SharedClock,
    shutdown: &mut watch::Receiver<bool>,
    backoff: &mut BackoffState,
) -> Result<(), TransportError> {
    let url = wire::stream_url(&config.endpoint, config.sample_rate_hz);
    let mut request = url
        .into_client_request()
        .map_err(|e| TransportError::WebSocket(e.to_string()))?;
    request
        .headers_mut()
        .insert("Authorization", api_key.parse().map_err(|_| {
            TransportError::WebSocket("invalid API key header value".to_string())
        })?);

    let connect_fut = tokio_tungstenite::connect_async(request);
    let (ws_stream, response) = match tokio::time::timeout(config.connect_timeout, connect_fut).await
    {
        Ok(Ok(pair)) => pair,
        Ok(Err(tokio_tungstenite::tungstenite::Error::Http(resp))) => {
            let status = resp.status();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(TransportError::CredentialRejected);
            }
            return Err(TransportError::WebSocket(format!(
                "handshake rejected: {status}"
            )));
        }
        Ok(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
        Err(_) => return Err(TransportError::ConnectTimeout(config.connect_timeout)),
    };
    if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
        return Err(TransportError::CredentialRejected);
    }

    backoff.on_connected(clock);

    let (mut write, mut read) = ws_stream.split();
    let mut last_audio_sent = clock.now();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }

            audio = audio_rx.recv() => {
                match audio {
                    Some(samples) => {
                        let mut bytes = Vec::with_capacity(samples.len() * 2);
                        for s in &samples {
                            bytes.extend_from_slice(&s.to_le_bytes());
                        }
                        if write.send(Message::Binary(bytes)).await.is_err() {
                            return Err(TransportError::Closed);
                        }
                        last_audio_sent = clock.now();
                    }
                    None => {
                        // Audio source stopped producing; treat as a graceful end
                        // of the listening window.
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                }
            }

            _ = tokio::time::sleep(config.heartbeat_interval) => {
                if clock.now().duration_since(last_audio_sent) >= config.heartbeat_interval {
                    if write.send(Message::Ping(Vec::new())).await.is_err() {
                        return Err(TransportError::Closed);
                    }
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch_text(&text, event_tx).await;
                    }
                    Some(Ok(Message::Close(_))) => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
                    None => return Ok(()),
                }
            }
        }
    }
}

async fn dispatch_text(text: &str, event_tx: &mpsc::Sender<InboundEvent>) {
    match wire::decode(text) {
        Ok(ServerMessage::Begin { id, .. }) => {
            let _ = event_tx.send(InboundEvent::Begin { session_id: id }).await;
        }
        Ok(ServerMessage::Turn {
            transcript,
            words,
            end_of_turn,
            turn_is_formatted,
        }) => {
            let _ = event_tx
                .send(InboundEvent::Turn {
                    transcript,
                    words: words.into_iter().map(Into::into).collect(),
                    end_of_turn,
                    turn_is_formatted,
                })
                .await;
        }
        Ok(ServerMessage::Termination { .. }) => {
            let _ = event_tx.send(InboundEvent::Termination).await;
        }
        Ok(ServerMessage::Error { code, message }) => {
            let _ = event_tx.send(InboundEvent::Error { code, message }).await;
        }
        Ok(ServerMessage::Unknown) => {
            tracing::debug!("ignoring unrecognized message type");
        }
        Err(e) => {
            tracing::warn!("dropping malformed inbound message: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceflow_foundation::clock::TestClock;
    use std::sync::Arc;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = ReconnectPolicy {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: 0.0,
            stable_after: Duration::from_secs(30),
        };
        let clock: SharedClock = Arc::new(TestClock::new());
        let mut backoff = BackoffState::new();

        let d1 = backoff.on_disconnected(&policy, &clock);
        assert_eq!(d1, Duration::from_millis(500));
        let d2 = backoff.on_disconnected(&policy, &clock);
        assert_eq!(d2, Duration::from_millis(1000));
        let d3 = backoff.on_disconnected(&policy, &clock);
        assert_eq!(d3, Duration::from_millis(2000));
    }

    #[test]
    fn backoff_resets_after_stable_session() {
        let policy = ReconnectPolicy {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: 0.0,
            stable_after: Duration::from_secs(30),
        };
        let test_clock = Arc::new(TestClock::new());
        let clock: SharedClock = test_clock.clone();
        let mut backoff = BackoffState::new();

        backoff.on_disconnected(&policy, &clock);
        backoff.on_disconnected(&policy, &clock);
        assert_eq!(backoff.level, 2);

        backoff.on_connected(&clock);
        test_clock.advance(Duration::from_secs(31));

        let delay = backoff.on_disconnected(&policy, &clock);
        assert_eq!(delay, Duration::from_millis(500));
    }
}
