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

//! In-memory dataset library for testing
//!
//! Dataset metadata lives in memory behind `Arc<RwLock<..>>`; item content is
//! written to files below a caller-supplied scratch directory because the
//! dataset contract hands out content *paths*.
//!
//! Clones share state, so a test can keep one clone to mutate datasets
//! "externally" (add items, freeze, inject failures) while a session holds
//! handles opened from another clone.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dtool_annex_dataset::{DatasetLibrary, DatasetState, MemoryLibrary};
//!
//! let library = MemoryLibrary::new("/tmp/scratch");
//! library.create_dataset("mem://ds", DatasetState::Frozen);
//! let id = library.add_item("mem://ds", "dir/file1", b"content")?;
//!
//! let dataset = library.open_dataset("mem://ds")?;
//! let path = dataset.item_content_abspath(&id)?;
//! assert_eq!(std::fs::read(path)?, b"content");
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::{DatasetError, DatasetResult};
use crate::hasher::{generate_identifier, HashFamily, MD5_HEXDIGEST};
use crate::manifest::{Manifest, ManifestItem};
use crate::{DatasetHandle, DatasetLibrary, DatasetState};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct MemoryItem {
    identifier: String,
    item: ManifestItem,
    content_path: PathBuf,
}

#[derive(Debug, Clone)]
struct MemoryDataset {
    name: String,
    state: DatasetState,
    hash_function: String,
    items: Vec<MemoryItem>,
    freeze_count: usize,
    manifest_calls: usize,
    fail_manifest: bool,
}

/// In-memory dataset library
#[derive(Clone)]
pub struct MemoryLibrary {
    datasets: Arc<RwLock<HashMap<String, MemoryDataset>>>,
    content_root: PathBuf,
}

impl MemoryLibrary {
    /// Create an empty library writing item content below `content_root`
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        MemoryLibrary {
            datasets: Arc::new(RwLock::new(HashMap::new())),
            content_root: content_root.into(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, MemoryDataset>> {
        self.datasets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, MemoryDataset>> {
        self.datasets.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an empty dataset hashed with `md5sum_hexdigest`
    pub fn create_dataset(&self, uri: &str, state: DatasetState) {
        self.create_dataset_with_hash(uri, state, MD5_HEXDIGEST);
    }

    /// Register an empty dataset with an explicit hash function name
    pub fn create_dataset_with_hash(&self, uri: &str, state: DatasetState, hash_function: &str) {
        let name = uri.rsplit('/').next().unwrap_or(uri).to_string();
        self.write().insert(
            uri.to_string(),
            MemoryDataset {
                name,
                state,
                hash_function: hash_function.to_string(),
                items: Vec::new(),
                freeze_count: 0,
                manifest_calls: 0,
                fail_manifest: false,
            },
        );
    }

    /// Add an item, hashing `content` with the dataset's hash function
    ///
    /// Returns the item identifier.
    pub fn add_item(&self, uri: &str, relpath: &str, content: &[u8]) -> DatasetResult<String> {
        let hash_function = self
            .read()
            .get(uri)
            .map(|d| d.hash_function.clone())
            .ok_or_else(|| DatasetError::not_found(uri))?;
        let hash = HashFamily::from_dtool_name(&hash_function)
            .map(|family| family.hex_digest(content))
            .unwrap_or_else(|| format!("{}:{}", hash_function, content.len()));
        self.add_item_with_hash(uri, relpath, &hash, content)
    }

    /// Add an item with a caller-chosen hash
    pub fn add_item_with_hash(
        &self,
        uri: &str,
        relpath: &str,
        hash: &str,
        content: &[u8],
    ) -> DatasetResult<String> {
        self.add_item_with_identifier(uri, &generate_identifier(relpath), relpath, hash, content)
    }

    /// Add an item under an explicit identifier
    ///
    /// dtool always derives identifiers from relpaths; this exists so tests
    /// can use short, readable identifiers.
    pub fn add_item_with_identifier(
        &self,
        uri: &str,
        identifier: &str,
        relpath: &str,
        hash: &str,
        content: &[u8],
    ) -> DatasetResult<String> {
        let identifier = identifier.to_string();
        let shard = identifier.get(..2).unwrap_or(&identifier);
        let dir = self
            .content_root
            .join(generate_identifier(uri))
            .join(shard);
        fs::create_dir_all(&dir)?;
        let content_path = dir.join(&identifier);
        fs::write(&content_path, content)?;

        let mut item = ManifestItem::new(relpath, hash);
        item.size_in_bytes = Some(content.len() as u64);

        let mut datasets = self.write();
        let dataset = datasets
            .get_mut(uri)
            .ok_or_else(|| DatasetError::not_found(uri))?;
        dataset.items.retain(|i| i.identifier != identifier);
        dataset.items.push(MemoryItem {
            identifier: identifier.clone(),
            item,
            content_path,
        });
        Ok(identifier)
    }

    /// Delete an item's content file while keeping it in the manifest
    pub fn remove_content(&self, uri: &str, identifier: &str) -> DatasetResult<()> {
        let path = self
            .read()
            .get(uri)
            .and_then(|d| d.items.iter().find(|i| i.identifier == identifier))
            .map(|i| i.content_path.clone())
            .ok_or_else(|| DatasetError::item_not_found(identifier))?;
        fs::remove_file(path)?;
        Ok(())
    }

    /// Freeze a dataset as another process would
    pub fn freeze_externally(&self, uri: &str) -> DatasetResult<()> {
        let mut datasets = self.write();
        let dataset = datasets
            .get_mut(uri)
            .ok_or_else(|| DatasetError::not_found(uri))?;
        dataset.state = DatasetState::Frozen;
        Ok(())
    }

    /// Make manifest generation fail (or succeed again)
    pub fn set_manifest_failure(&self, uri: &str, fail: bool) {
        if let Some(dataset) = self.write().get_mut(uri) {
            dataset.fail_manifest = fail;
        }
    }

    /// Number of `freeze` calls made through handles that changed state
    pub fn freeze_count(&self, uri: &str) -> usize {
        self.read().get(uri).map(|d| d.freeze_count).unwrap_or(0)
    }

    /// Number of manifests generated for a dataset
    pub fn manifest_calls(&self, uri: &str) -> usize {
        self.read().get(uri).map(|d| d.manifest_calls).unwrap_or(0)
    }

    /// Current state of a dataset
    pub fn state(&self, uri: &str) -> Option<DatasetState> {
        self.read().get(uri).map(|d| d.state)
    }

    fn open_as(&self, uri: &str, expected: DatasetState) -> DatasetResult<Box<dyn DatasetHandle>> {
        let datasets = self.read();
        let dataset = datasets.get(uri).ok_or_else(|| DatasetError::not_found(uri))?;
        if dataset.state != expected {
            return Err(DatasetError::incompatible(
                uri,
                expected.dtool_type(),
                dataset.state.dtool_type(),
            ));
        }
        Ok(Box::new(MemoryHandle {
            uri: uri.to_string(),
            name: dataset.name.clone(),
            state: dataset.state,
            library: self.clone(),
        }))
    }
}

impl fmt::Debug for MemoryLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLibrary")
            .field("content_root", &self.content_root)
            .finish()
    }
}

impl DatasetLibrary for MemoryLibrary {
    fn open_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>> {
        self.open_as(uri, DatasetState::Frozen)
    }

    fn open_proto_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>> {
        self.open_as(uri, DatasetState::InProgress)
    }
}

/// Handle onto a [`MemoryLibrary`] dataset
#[derive(Debug)]
pub struct MemoryHandle {
    uri: String,
    name: String,
    state: DatasetState,
    library: MemoryLibrary,
}

impl DatasetHandle for MemoryHandle {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> DatasetState {
        self.state
    }

    fn reload_state(&mut self) -> DatasetResult<DatasetState> {
        self.state = self
            .library
            .state(&self.uri)
            .ok_or_else(|| DatasetError::not_found(&self.uri))?;
        Ok(self.state)
    }

    fn generate_manifest(&self) -> DatasetResult<Manifest> {
        let mut datasets = self.library.write();
        let dataset = datasets
            .get_mut(&self.uri)
            .ok_or_else(|| DatasetError::not_found(&self.uri))?;
        dataset.manifest_calls += 1;
        if dataset.fail_manifest {
            return Err(DatasetError::metadata(format!(
                "manifest of {} unavailable",
                self.uri
            )));
        }

        let mut manifest = Manifest::new(dataset.hash_function.clone());
        for item in &dataset.items {
            manifest.insert(item.identifier.clone(), item.item.clone());
        }
        Ok(manifest)
    }

    fn item_content_abspath(&self, identifier: &str) -> DatasetResult<PathBuf> {
        self.library
            .read()
            .get(&self.uri)
            .and_then(|d| d.items.iter().find(|i| i.identifier == identifier))
            .map(|i| i.content_path.clone())
            .ok_or_else(|| DatasetError::item_not_found(identifier))
    }

    fn freeze(&mut self) -> DatasetResult<()> {
        let mut datasets = self.library.write();
        let dataset = datasets
            .get_mut(&self.uri)
            .ok_or_else(|| DatasetError::not_found(&self.uri))?;
        if dataset.state == DatasetState::InProgress {
            dataset.state = DatasetState::Frozen;
            dataset.freeze_count += 1;
        }
        self.state = DatasetState::Frozen;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URI: &str = "mem://datasets/ds";

    #[test]
    fn test_open_respects_state() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::InProgress);

        assert!(library.open_dataset(URI).unwrap_err().is_incompatible());
        assert!(library.open_proto_dataset(URI).is_ok());
        assert!(library.open_dataset("mem://other").unwrap_err().is_not_found());
    }

    #[test]
    fn test_items_and_content() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let id = library.add_item(URI, "dir/file1", b"").unwrap();

        let handle = library.open_dataset(URI).unwrap();
        let manifest = handle.generate_manifest().unwrap();
        assert_eq!(manifest.get(&id).unwrap().hash, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(handle.name(), "ds");

        let path = handle.item_content_abspath(&id).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"");
        assert_eq!(library.manifest_calls(URI), 1);
    }

    #[test]
    fn test_handles_observe_external_changes() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::InProgress);
        let mut handle = library.open_proto_dataset(URI).unwrap();

        library.add_item(URI, "late", b"late").unwrap();
        assert_eq!(handle.generate_manifest().unwrap().len(), 1);

        library.freeze_externally(URI).unwrap();
        assert_eq!(handle.state(), DatasetState::InProgress);
        assert_eq!(handle.reload_state().unwrap(), DatasetState::Frozen);
    }

    #[test]
    fn test_freeze_counts_only_transitions() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::InProgress);
        let mut handle = library.open_proto_dataset(URI).unwrap();

        handle.freeze().unwrap();
        handle.freeze().unwrap();
        assert_eq!(library.freeze_count(URI), 1);
        assert_eq!(library.state(URI), Some(DatasetState::Frozen));
    }

    #[test]
    fn test_manifest_failure_injection() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let handle = library.open_dataset(URI).unwrap();

        library.set_manifest_failure(URI, true);
        assert!(handle.generate_manifest().is_err());
        library.set_manifest_failure(URI, false);
        assert!(handle.generate_manifest().is_ok());
    }
}
