use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the VoiceFlow engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Injection(#[from] InjectionError),

    #[error("Component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

// From trait implementations for common error types
impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Injection(InjectionError::Io(err))
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::Transient(format!("Task join failed: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Device disconnected")]
    DeviceDisconnected,

    #[error("Permission denied for audio capture")]
    PermissionDenied,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("Buffer overflow, dropped {count} frames")]
    BufferOverflow { count: usize },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),
}

/// Errors from the streaming speech-service client (C2).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Credential rejected by speech service")]
    CredentialRejected,

    #[error("Malformed inbound message: {0}")]
    MalformedMessage(String),

    #[error("Socket closed by peer")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid command phrase: {0}")]
    InvalidCommandPhrase(String),

    #[error("Environment variable error: {0}")]
    EnvVar(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InjectionError {
    #[error("No editable focus found")]
    NoEditableFocus,

    #[error("Method not available: {0}")]
    MethodNotAvailable(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("All methods failed: {0}")]
    AllMethodsFailed(String),

    #[error("Accessibility permission not granted")]
    PermissionDenied,

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

/// Device status events for monitoring audio device changes
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    DeviceAdded { name: String },
    DeviceRemoved { name: String },
    CurrentDeviceDisconnected { name: String },
    DeviceSwitched { from: Option<String>, to: String },
    DeviceSwitchFailed {
        attempted: String,
        fallback: Option<String>,
    },
    DeviceSwitchRequested { target: String },
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    TransitionToOff,
    Ignore,
    Fatal,
}

impl EngineError {
    /// Maps an error to the recovery action the Mode Controller (C6) or the
    /// component that raised it should take, per the error-handling design.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            EngineError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            EngineError::Audio(AudioError::PermissionDenied) => RecoveryStrategy::TransitionToOff,
            EngineError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            EngineError::Transport(TransportError::CredentialRejected) => {
                RecoveryStrategy::TransitionToOff
            }
            EngineError::Transport(TransportError::MalformedMessage(_)) => RecoveryStrategy::Ignore,
            EngineError::Transport(_) => RecoveryStrategy::Retry {
                max_attempts: u32::MAX,
                delay: Duration::from_millis(500),
            },
            EngineError::Fatal(_) | EngineError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Retry {
                max_attempts: 3,
                delay: Duration::from_millis(500),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    pub silence_threshold: i16,
    /// Ring buffer capacity in samples. At 16kHz mono, 65536 samples ≈ 4.1 seconds.
    pub capture_buffer_samples: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 100,
            capture_buffer_samples: 65_536,
        }
    }
}
