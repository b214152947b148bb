// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! # dtool-annex Test Utilities
//!
//! Shared test utilities for dtool-annex crates providing:
//! - Builders that write dtool datasets (frozen or proto) to disk
//! - CLI command helpers for testing the `dtool-annex` binaries
//! - Cross-platform path to URI conversion

pub mod cli;
pub mod dataset;
pub mod platform;

pub use cli::{dtool_annex, git_annex_remote_dtool};
pub use dataset::{FixtureItem, TestDataset, TestDatasetBuilder};
pub use platform::TestPaths;
