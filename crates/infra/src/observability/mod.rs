//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`
//! (default `info`). Safe to call more than once; only the first call takes
//! effect, so tests can call it freely.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines, colored when stderr is a terminal.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy()
}

/// Initialize the global tracing subscriber.
pub fn init_tracing(format: LogFormat) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr);

        // A subscriber may already be installed by the host application.
        let installed = match format {
            LogFormat::Pretty => {
                builder.with_ansi(std::io::stderr().is_terminal()).try_init().is_ok()
            }
            LogFormat::Json => builder.json().try_init().is_ok(),
        };

        if installed {
            tracing::debug!(?format, "tracing initialized");
        }
    });
}
