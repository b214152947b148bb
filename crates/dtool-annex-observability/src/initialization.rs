// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Subscriber installation.

use crate::config::{LogConfig, LogError, LogFormat};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Installs a stderr subscriber with `format` and `level`
///
/// # Example
///
/// ```no_run
/// use dtool_annex_observability::{init_tracing, LogFormat};
///
/// init_tracing(LogFormat::Compact, "debug").unwrap();
/// tracing::info!("Remote started");
/// ```
pub fn init_tracing(format: LogFormat, level: &str) -> Result<(), LogError> {
    init_tracing_with_config(&LogConfig::new().with_format(format).with_level(level))
}

/// Installs a stderr subscriber from the environment
///
/// See [`LogConfig::from_env`].
pub fn init_from_env(default_level: &str) -> Result<(), LogError> {
    init_tracing_with_config(&LogConfig::from_env(default_level)?)
}

/// Installs a stderr subscriber for `config`
///
/// # Errors
///
/// `LogError::InvalidFilter` for a bad directive, `LogError::AlreadyInitialized`
/// if a global subscriber is already set.
pub fn init_tracing_with_config(config: &LogConfig) -> Result<(), LogError> {
    let registry = Registry::default().with(build_env_filter(config)?);
    let already = |e: tracing_subscriber::util::TryInitError| {
        LogError::AlreadyInitialized(e.to_string())
    };

    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(config.include_targets)
                .with_ansi(config.use_color)
                .pretty();
            if config.use_timestamps {
                registry.with(layer).try_init().map_err(already)
            } else {
                registry.with(layer.without_time()).try_init().map_err(already)
            }
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .with_target(config.include_targets)
                .with_ansi(config.use_color)
                .compact();
            if config.use_timestamps {
                registry.with(layer).try_init().map_err(already)
            } else {
                registry.with(layer.without_time()).try_init().map_err(already)
            }
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .with_writer(io::stderr)
                .json()
                .with_target(config.include_targets);
            if config.use_timestamps {
                registry.with(layer).try_init().map_err(already)
            } else {
                registry.with(layer.without_time()).try_init().map_err(already)
            }
        }
    }
}

/// Build an environment filter for the given configuration
fn build_env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(&config.level).map_err(|e| LogError::InvalidFilter {
        filter: config.level.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installing the global subscriber is covered by the integration test,
    // which runs in its own process.

    #[test]
    fn test_env_filter_parsing() {
        assert!(build_env_filter(&LogConfig::new().with_level("debug")).is_ok());
        assert!(build_env_filter(&LogConfig::new().with_level("dtool_annex_remote=trace,warn")).is_ok());
    }

    #[test]
    fn test_invalid_filter() {
        let err = build_env_filter(&LogConfig::new().with_level("dtool_annex=loud")).unwrap_err();
        assert!(matches!(err, LogError::InvalidFilter { .. }));
    }
}
