// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Logging configuration.
//!
//! The binaries read their logging setup from the environment:
//!
//! - `DTOOL_ANNEX_LOG`: an `EnvFilter` directive, falling back to `RUST_LOG`
//! - `DTOOL_ANNEX_LOG_FORMAT`: `pretty`, `compact` or `json`

use std::io::{self, IsTerminal};
use std::str::FromStr;
use thiserror::Error;

/// Filter variable read first
pub const LOG_ENV: &str = "DTOOL_ANNEX_LOG";

/// Filter variable read when [`LOG_ENV`] is unset
pub const FALLBACK_LOG_ENV: &str = "RUST_LOG";

/// Format variable
pub const LOG_FORMAT_ENV: &str = "DTOOL_ANNEX_LOG_FORMAT";

/// Errors that can occur during logging configuration
#[derive(Error, Debug)]
pub enum LogError {
    /// Unknown format name
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Filter directive did not parse
    #[error("Failed to parse log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The directive as given
        filter: String,
        /// Parser message
        reason: String,
    },

    /// A global subscriber is already installed
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Output format for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,

    /// Single line per event
    #[default]
    Compact,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(LogError::InvalidFormat(format!(
                "Unknown format: {}. Expected one of: pretty, compact, json",
                s
            ))),
        }
    }
}

/// Configuration for logging
///
/// Output always goes to stderr: the remote binary's stdout is the
/// git-annex protocol channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,

    /// Filter directive (e.g. `warn`, `dtool_annex_remote=debug`)
    pub level: String,

    /// Whether to emit ANSI colors (ignored for JSON)
    pub use_color: bool,

    /// Whether to include timestamps
    pub use_timestamps: bool,

    /// Whether to include target module names
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::default(),
            level: "info".to_string(),
            use_color: true,
            use_timestamps: true,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration from the process environment
    ///
    /// `default_level` applies when neither filter variable is set. Colors
    /// are enabled only when stderr is a terminal; git-annex captures the
    /// remote's stderr.
    pub fn from_env(default_level: &str) -> Result<Self, LogError> {
        let config = Self::from_lookup(default_level, |name| std::env::var(name).ok())?;
        Ok(config.with_color(io::stderr().is_terminal()))
    }

    /// Reads the configuration through `lookup` instead of the environment
    pub fn from_lookup(
        default_level: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LogError> {
        let set = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let level = set(LOG_ENV)
            .or_else(|| set(FALLBACK_LOG_ENV))
            .unwrap_or_else(|| default_level.to_string());
        let format = match set(LOG_FORMAT_ENV) {
            Some(format) => format.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self::new().with_level(level).with_format(format))
    }

    /// Set the output format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable or disable color output
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    /// Enable or disable timestamps
    pub fn with_timestamps(mut self, use_timestamps: bool) -> Self {
        self.use_timestamps = use_timestamps;
        self
    }

    /// Enable or disable target module names
    pub fn with_targets(mut self, include_targets: bool) -> Self {
        self.include_targets = include_targets;
        self
    }
}
