use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "text_expander=info,expander_engine=info";
const LOG_FILE_NAME: &str = "text-expander.log";

/// Keeps the background log writer alive; drop it last so buffered lines are flushed.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Route `tracing` output to `<data_dir>/logs`. Logs never go to the terminal, which the
/// playground owns. Returns `None` when the directory cannot be created or a subscriber is
/// already installed.
pub fn init(data_dir: &Path) -> Option<LoggingGuard> {
    let log_dir = data_dir.join("logs");
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        // No subscriber yet, so this is the only place the failure can surface.
        eprintln!("warning: failed to create {}: {err}", log_dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true),
    );
    if subscriber.try_init().is_err() {
        return None;
    }

    tracing::info!(log_dir = %log_dir.display(), "tracing initialized");
    Some(LoggingGuard { _guard: guard })
}
