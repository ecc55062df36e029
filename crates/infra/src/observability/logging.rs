//! Tracing subscriber initialisation.
//!
//! `RUST_LOG` wins over the configured level when set. Output is either the
//! human-readable formatter or JSON lines.

use fieldsync_domain::{FieldSyncError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed, so tests and
/// embedders can call this more than once.
///
/// # Errors
/// `FieldSyncError::Config` if the configured level is not a valid filter.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let json_layer = config.json.then(|| fmt::layer().json().with_target(true));
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));

    let installed =
        tracing_subscriber::registry().with(filter).with(json_layer).with(text_layer).try_init();

    Ok(installed.is_ok())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        FieldSyncError::Config(format!("invalid logging.level '{}': {}", config.level, e))
    })
}
