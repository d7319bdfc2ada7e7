//! Foundation crate tests
//!
//! Tests cover:
//! - Clock abstraction (RealClock, TestClock, SharedClock)
//! - Error types (EngineError, AudioError, TransportError, ConfigError, InjectionError)
//! - Error -> recovery strategy mapping

use std::time::{Duration, Instant};
use voiceflow_foundation::clock::{real_clock, test_clock, Clock, RealClock, TestClock};
use voiceflow_foundation::error::{
    AudioError, ConfigError, EngineError, InjectionError, RecoveryStrategy, TransportError,
};

// ─── RealClock Tests ────────────────────────────────────────────────

#[test]
fn real_clock_now_returns_current_time() {
    let clock = RealClock::new();
    let before = Instant::now();
    let clock_time = clock.now();
    let after = Instant::now();
    assert!(clock_time >= before);
    assert!(clock_time <= after);
}

#[test]
fn real_clock_factory_function() {
    let clock = real_clock();
    let t = clock.now();
    assert!(t.elapsed() < Duration::from_secs(1));
}

// ─── TestClock Tests ────────────────────────────────────────────────

#[test]
fn test_clock_starts_at_current_time() {
    let before = Instant::now();
    let clock = TestClock::new();
    let clock_time = clock.now();
    assert!(clock_time.duration_since(before) < Duration::from_millis(100));
}

#[test]
fn test_clock_advance() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(5));
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    clock.advance(Duration::from_millis(300));
    let elapsed = clock.now().duration_since(start);
    assert_eq!(elapsed, Duration::from_millis(600));
}

#[test]
fn test_clock_sleep_advances_time() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(10));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(10));
}

#[test]
fn test_clock_set_time() {
    let clock = TestClock::new();
    let target = Instant::now() + Duration::from_secs(1000);
    clock.set_time(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn test_clock_factory_function() {
    let clock = test_clock();
    let t = clock.now();
    clock.sleep(Duration::from_secs(1));
    let t2 = clock.now();
    assert_eq!(t2.duration_since(t), Duration::from_secs(1));
}

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_device_not_found() {
    let err = AudioError::DeviceNotFound {
        name: Some("test_mic".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("test_mic"));
}

#[test]
fn audio_error_buffer_overflow() {
    let err = AudioError::BufferOverflow { count: 512 };
    let msg = format!("{}", err);
    assert!(msg.contains("512"));
}

#[test]
fn audio_error_format_not_supported() {
    let err = AudioError::FormatNotSupported {
        format: "f64".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("f64"));
}

#[test]
fn transport_error_credential_rejected_message() {
    let err = TransportError::CredentialRejected;
    let msg = format!("{}", err);
    assert!(msg.contains("Credential rejected"));
}

#[test]
fn transport_error_malformed_message() {
    let err = TransportError::MalformedMessage("unknown type tag".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("unknown type tag"));
}

#[test]
fn injection_error_timeout() {
    let err = InjectionError::Timeout(5000);
    let msg = format!("{}", err);
    assert!(msg.contains("5000"));
}

#[test]
fn injection_error_no_editable_focus() {
    let err = InjectionError::NoEditableFocus;
    let msg = format!("{}", err);
    assert!(msg.contains("editable focus"));
}

#[test]
fn config_error_validation() {
    let err = ConfigError::Validation {
        field: "sample_rate".to_string(),
        reason: "must be 16000".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("sample_rate"));
}

#[test]
fn config_error_invalid_command_phrase() {
    let err = ConfigError::InvalidCommandPhrase("  ".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("Invalid command phrase"));
}

// ─── EngineError conversion / recovery-strategy tests ────────────────

#[test]
fn engine_error_from_audio_error() {
    let err: EngineError = AudioError::DeviceDisconnected.into();
    assert!(matches!(err, EngineError::Audio(AudioError::DeviceDisconnected)));
}

#[test]
fn engine_error_from_transport_error() {
    let err: EngineError = TransportError::Closed.into();
    assert!(matches!(err, EngineError::Transport(TransportError::Closed)));
}

#[test]
fn engine_error_from_injection_error() {
    let err: EngineError = InjectionError::NoEditableFocus.into();
    assert!(matches!(err, EngineError::Injection(InjectionError::NoEditableFocus)));
}

#[test]
fn engine_error_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    let err: EngineError = io_err.into();
    assert!(matches!(err, EngineError::Injection(InjectionError::Io(_))));
}

#[test]
fn engine_error_shutdown_requested_message() {
    let err = EngineError::ShutdownRequested;
    let msg = format!("{}", err);
    assert!(msg.contains("Shutdown"));
}

#[test]
fn engine_error_fatal_message() {
    let err = EngineError::Fatal("critical failure".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("critical failure"));
}

#[test]
fn recovery_strategy_device_disconnected_retries() {
    let err = EngineError::Audio(AudioError::DeviceDisconnected);
    assert!(matches!(
        err.recovery_strategy(),
        RecoveryStrategy::Retry { max_attempts: 5, .. }
    ));
}

#[test]
fn recovery_strategy_permission_denied_transitions_off() {
    let err = EngineError::Audio(AudioError::PermissionDenied);
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::TransitionToOff));
}

#[test]
fn recovery_strategy_buffer_overflow_ignored() {
    let err = EngineError::Audio(AudioError::BufferOverflow { count: 10 });
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Ignore));
}

#[test]
fn recovery_strategy_credential_rejected_transitions_off() {
    let err = EngineError::Transport(TransportError::CredentialRejected);
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::TransitionToOff));
}

#[test]
fn recovery_strategy_malformed_message_ignored() {
    let err = EngineError::Transport(TransportError::MalformedMessage("bad json".to_string()));
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Ignore));
}

#[test]
fn recovery_strategy_fatal_is_fatal() {
    let err = EngineError::Fatal("unrecoverable".to_string());
    assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
}
