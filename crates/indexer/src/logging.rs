//! Tracing initialization for embedding processes.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level '{level}': {source}")]
    InvalidLogLevel {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Initialize tracing with the given level filter.
///
/// `json_format` switches the console output to one JSON object per line,
/// matching what log aggregators expect.
pub fn init(level: &str, json_format: bool) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLogLevel {
            level: level.to_string(),
            source,
        })?;

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    Ok(())
}
