// dtool-annex - git-annex special remote for dtool datasets
// Copyright (C) 2025 dtool-annex Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Structured logging shared by the dtool-annex binaries.
//!
//! Everything is written to stderr. The filter comes from `DTOOL_ANNEX_LOG`
//! (or `RUST_LOG`), the format from `DTOOL_ANNEX_LOG_FORMAT`.
//!
//! ```no_run
//! dtool_annex_observability::init_from_env("warn").ok();
//! tracing::warn!("Dataset is still in progress");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, FALLBACK_LOG_ENV, LOG_ENV, LOG_FORMAT_ENV};
pub use initialization::{init_from_env, init_tracing, init_tracing_with_config};
