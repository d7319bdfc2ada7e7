// Logging behavior:
// - Writes logs to both stderr and a daily-rotated file at logs/voiceflow.log.
// - Default log level comes from settings.log_level, overridable via RUST_LOG:
//   * RUST_LOG=info                      # Standard logging (default)
//   * RUST_LOG=debug                     # Verbose (turn/command matching detail)
//   * RUST_LOG=voiceflow_engine=trace    # Fine-grained per-module control
// - The logs/ directory is created on startup if missing; file output uses a
//   non-blocking writer. File layer disables ANSI to keep logs clean.
use std::fs;
use std::path::Path;
use std::time::Duration;
use std::time::SystemTime;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voiceflow_app::config;
use voiceflow_app::runtime;
use voiceflow_audio::DeviceManager;

fn init_logging(
    default_level: &str,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "voiceflow.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking_file).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Prune rotated log files in `logs/` older than `retention_days` days.
/// If `retention_days` is `Some(0)` pruning is disabled. Default is 7 days when `None`.
fn prune_old_logs(retention_days: Option<u64>) {
    let retention = retention_days.unwrap_or(7);
    if retention == 0 {
        tracing::debug!("log retention disabled (retention_days=0)");
        return;
    }

    let cutoff = match SystemTime::now().checked_sub(Duration::from_secs(retention * 24 * 60 * 60))
    {
        Some(t) => t,
        None => return,
    };

    let logs_dir = Path::new("logs");
    if !logs_dir.exists() {
        return;
    }

    match fs::read_dir(logs_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    if name.starts_with("voiceflow.log.") {
                        if let Ok(meta) = entry.metadata() {
                            if let Ok(modified) = meta.modified() {
                                if modified < cutoff {
                                    if let Err(e) = fs::remove_file(&path) {
                                        tracing::warn!(
                                            "failed to remove old log {}: {}",
                                            path.display(),
                                            e
                                        );
                                    } else {
                                        tracing::info!("removed old log file: {}", path.display());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Err(e) => tracing::warn!("failed to read logs directory for pruning: {}", e),
    }
}

#[derive(Parser, Debug)]
#[command(name = "voiceflow", author, version, about = "VoiceFlow transcription engine")]
struct Cli {
    /// List available input devices and exit.
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Name of the environment variable holding the AssemblyAI API key.
    /// Overrides the value from settings.
    #[arg(long = "api-key-env")]
    api_key_env: Option<String>,

    /// Mode to start in: off, dictation, or wake. Overrides settings.start_mode.
    #[arg(long = "start-mode")]
    start_mode: Option<String>,

    /// Tracing log level (error|warn|info|debug|trace). Overrides settings.log_level
    /// and RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Give PipeWire better routing hints if using its ALSA bridge (Linux only).
    #[cfg(target_os = "linux")]
    std::env::set_var(
        "PIPEWIRE_PROPS",
        "{ application.name=VoiceFlow media.role=capture }",
    );

    let cli = Cli::parse();

    let mut settings = config::load_settings().unwrap_or_else(|e| {
        eprintln!("failed to load settings: {e}; falling back to defaults");
        config::Settings::default()
    });

    if let Some(api_key_env) = &cli.api_key_env {
        settings.api_key_env = api_key_env.clone();
    }
    if let Some(start_mode) = &cli.start_mode {
        settings.start_mode = start_mode.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }

    let _log_guard = init_logging(&settings.log_level)?;
    let retention_days = std::env::var("VOICEFLOW_LOG_RETENTION_DAYS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());
    prune_old_logs(retention_days);
    tracing::info!("starting VoiceFlow");

    if cli.list_devices {
        let dm = DeviceManager::new()?;
        tracing::info!("CPAL host: {:?}", dm.host_id());
        let devices = dm.enumerate_devices();
        println!("Input devices (host: {:?}):", dm.host_id());
        for d in devices {
            let def = if d.is_default { " (default)" } else { "" };
            println!("- {}{}", d.name, def);
        }
        return Ok(());
    }

    if let Err(e) = settings.validate() {
        tracing::error!("invalid settings: {e}");
        return Err(Box::new(e));
    }

    runtime::run(settings).await?;

    tracing::info!("VoiceFlow shut down cleanly");
    Ok(())
}
