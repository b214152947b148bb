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

//! Dataset access layer for dtool-annex
//!
//! This crate provides a small, synchronous interface to dtool datasets:
//! - On-disk datasets (via [`disk::DiskLibrary`])
//! - In-memory datasets for tests (via [`mock::MemoryLibrary`])
//!
//! # Architecture
//!
//! [`DatasetLibrary`] opens datasets by URI and hands out [`DatasetHandle`]s.
//! A handle is either *frozen* (immutable, stable manifest) or *in progress*
//! (a dtool "proto dataset" that may still be receiving items).
//!
//! ## Core Concepts
//!
//! - **Manifest**: identifier → `{hash, relpath}` index of a dataset
//! - **Item identifier**: SHA-1 hex digest of the item's relpath
//! - **Content path**: absolute path at which an item's bytes can be read
//!
//! # Examples
//!
//! ```no_run
//! use dtool_annex_dataset::{DatasetLibrary, disk::DiskLibrary};
//!
//! fn main() -> anyhow::Result<()> {
//!     let library = DiskLibrary::new();
//!     let dataset = library.open_dataset("file:///data/my-dataset")?;
//!
//!     let manifest = dataset.generate_manifest()?;
//!     for entry in manifest.entries() {
//!         let path = dataset.item_content_abspath(entry.identifier)?;
//!         println!("{} -> {}", entry.item.relpath, path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Implementation Guide
//!
//! When implementing `DatasetLibrary`:
//!
//! 1. `open_dataset` must fail with `DatasetError::Incompatible` for
//!    in-progress datasets so callers can fall back to `open_proto_dataset`
//! 2. Content paths are handed to callers read-only; never return a path the
//!    caller is expected to clean up
//! 3. `freeze` on a frozen handle is a no-op

pub mod disk;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod mock;
pub mod uri;

use std::fmt::{self, Debug};
use std::path::PathBuf;

pub use disk::DiskLibrary;
pub use error::{DatasetError, DatasetResult};
pub use hasher::{generate_identifier, HashFamily};
pub use manifest::{Manifest, ManifestEntry, ManifestItem};
pub use mock::MemoryLibrary;

/// Lifecycle state of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetState {
    /// Frozen, immutable dataset with a stable manifest
    Frozen,
    /// Proto dataset that may still change
    InProgress,
}

impl DatasetState {
    /// Whether the dataset is frozen
    pub fn is_frozen(&self) -> bool {
        matches!(self, DatasetState::Frozen)
    }

    /// The `type` value dtool writes into admin metadata for this state
    pub fn dtool_type(&self) -> &'static str {
        match self {
            DatasetState::Frozen => "dataset",
            DatasetState::InProgress => "protodataset",
        }
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetState::Frozen => f.write_str("frozen"),
            DatasetState::InProgress => f.write_str("in-progress"),
        }
    }
}

/// An opened dataset
///
/// Handles are used from one thread at a time; all operations block.
pub trait DatasetHandle: Debug + Send {
    /// URI the handle was opened from
    fn uri(&self) -> &str;

    /// Human readable dataset name
    fn name(&self) -> &str;

    /// State observed when the handle was opened or last reloaded
    fn state(&self) -> DatasetState;

    /// Re-read the dataset's state from its backing store
    ///
    /// Another process may freeze a proto dataset while a handle is open.
    fn reload_state(&mut self) -> DatasetResult<DatasetState>;

    /// Build the current manifest
    ///
    /// Frozen datasets return their stored manifest. In-progress datasets
    /// compute one from their current items, which may differ between calls.
    fn generate_manifest(&self) -> DatasetResult<Manifest>;

    /// Absolute path of an item's content
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::ItemNotFound` if no item has the identifier.
    fn item_content_abspath(&self, identifier: &str) -> DatasetResult<PathBuf>;

    /// Freeze an in-progress dataset; a no-op for frozen datasets
    fn freeze(&mut self) -> DatasetResult<()>;
}

/// Opens datasets by URI
pub trait DatasetLibrary: Debug + Send {
    /// Open a frozen dataset
    ///
    /// # Errors
    ///
    /// - `DatasetError::Incompatible` if the dataset is still in progress
    /// - `DatasetError::NotFound` if nothing exists at the URI
    fn open_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>>;

    /// Open an in-progress (proto) dataset
    ///
    /// # Errors
    ///
    /// - `DatasetError::Incompatible` if the dataset is already frozen
    /// - `DatasetError::NotFound` if nothing exists at the URI
    fn open_proto_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>>;
}
