//! Tracing subscriber setup.
//!
//! Logs go to stderr, either human-readable or one JSON object per line.
//! `RUST_LOG` takes precedence over the configured level.

use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global tracing subscriber.
///
/// Does nothing if a subscriber is already installed, so embedding
/// applications keep their own.
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = mk_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    match result {
        Ok(()) => Ok(()),
        // Lost a race with another initialiser.
        Err(_) if tracing::dispatcher::has_been_set() => Ok(()),
        Err(e) => Err(RunnerError::Logging(e.to_string())),
    }
}

fn mk_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| RunnerError::Config(format!("invalid log level '{}': {}", level, e)))
}
