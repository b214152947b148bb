// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Per-process session state
//!
//! A [`Session`] binds one dataset URI for its whole life. It owns the
//! dataset handle, performs the one-time in-progress to frozen transition
//! and optionally caches the manifest of a frozen dataset.

use crate::config::{ManifestPolicy, RemoteConfig};
use crate::error::{RemoteError, RemoteResult};
use dtool_annex_dataset::{DatasetHandle, DatasetLibrary, DatasetState, Manifest};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session bound to one dataset
#[derive(Debug)]
pub struct Session {
    config: RemoteConfig,
    library: Arc<dyn DatasetLibrary>,
    handle: Option<Box<dyn DatasetHandle>>,
    freeze_checked: bool,
    freeze_transitions: usize,
    cached_manifest: Option<Arc<Manifest>>,
}

impl Session {
    /// Creates a session; no dataset is opened yet
    pub fn new(config: RemoteConfig, library: Arc<dyn DatasetLibrary>) -> Self {
        Self {
            config,
            library,
            handle: None,
            freeze_checked: false,
            freeze_transitions: 0,
            cached_manifest: None,
        }
    }

    /// Bound configuration
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Bound dataset URI
    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    /// Opens the dataset
    ///
    /// A frozen dataset is preferred. An in-progress one is opened as a
    /// proto dataset and frozen on first manifest access.
    ///
    /// # Errors
    ///
    /// `RemoteError::BackendUnavailable` if the dataset cannot be opened in
    /// either state.
    pub fn open(&mut self) -> RemoteResult<()> {
        let uri = self.config.uri.clone();
        let handle = match self.library.open_dataset(&uri) {
            Ok(handle) => {
                debug!("Dataset {} frozen, immutable", uri);
                handle
            }
            Err(e) if e.is_incompatible() => {
                warn!("{}", e);
                self.library
                    .open_proto_dataset(&uri)
                    .map_err(|source| RemoteError::BackendUnavailable {
                        uri: uri.clone(),
                        source,
                    })?
            }
            Err(source) => return Err(RemoteError::BackendUnavailable { uri, source }),
        };

        self.handle = Some(handle);
        self.freeze_checked = false;
        self.cached_manifest = None;
        Ok(())
    }

    /// Whether a dataset handle is held
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// State of the held handle
    pub fn state(&self) -> Option<DatasetState> {
        self.handle.as_ref().map(|h| h.state())
    }

    /// Name of the open dataset
    pub fn dataset_name(&self) -> Option<&str> {
        self.handle.as_ref().map(|h| h.name())
    }

    /// How often an in-progress handle was replaced by a frozen one
    pub fn freeze_transitions(&self) -> usize {
        self.freeze_transitions
    }

    fn handle(&self) -> RemoteResult<&dyn DatasetHandle> {
        self.handle
            .as_deref()
            .ok_or_else(|| RemoteError::NotReady("dataset access".to_string()))
    }

    /// Makes sure the held handle is frozen
    ///
    /// Runs at most once per opened dataset. An in-progress handle first
    /// re-reads its state, since another process may have frozen it; if it
    /// is still in progress it is frozen here. Either way the dataset is
    /// re-opened as frozen and any cached manifest is dropped.
    fn ensure_frozen(&mut self) -> RemoteResult<()> {
        if self.freeze_checked {
            return Ok(());
        }
        let handle = self
            .handle
            .as_mut()
            .ok_or_else(|| RemoteError::NotReady("dataset access".to_string()))?;

        if handle.state() == DatasetState::InProgress {
            if handle.reload_state()? == DatasetState::InProgress {
                info!("Freezing in-progress dataset {}", self.config.uri);
                handle.freeze()?;
            } else {
                debug!("Dataset {} was frozen by another process", self.config.uri);
            }

            self.handle = Some(self.library.open_dataset(&self.config.uri)?);
            self.cached_manifest = None;
            self.freeze_transitions += 1;
        }

        self.freeze_checked = true;
        Ok(())
    }

    /// Current manifest of the dataset
    pub fn manifest(&mut self) -> RemoteResult<Arc<Manifest>> {
        self.ensure_frozen()?;
        if let Some(manifest) = &self.cached_manifest {
            return Ok(Arc::clone(manifest));
        }

        let handle = self.handle()?;
        let manifest = Arc::new(handle.generate_manifest()?);
        debug!(
            "Fetched manifest of {} ({} items, {})",
            self.config.uri,
            manifest.len(),
            manifest.hash_function
        );

        if self.config.manifest_policy == ManifestPolicy::CacheFrozen && handle.state().is_frozen() {
            self.cached_manifest = Some(Arc::clone(&manifest));
        }
        Ok(manifest)
    }

    /// Absolute content path of an item
    pub fn content_path(&mut self, item_id: &str) -> RemoteResult<PathBuf> {
        self.ensure_frozen()?;
        Ok(self.handle()?.item_content_abspath(item_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtool_annex_dataset::MemoryLibrary;
    use tempfile::TempDir;

    const URI: &str = "mem://ds";

    fn session(library: &MemoryLibrary, policy: ManifestPolicy) -> Session {
        let config = RemoteConfig::new(URI).with_manifest_policy(policy);
        Session::new(config, Arc::new(library.clone()))
    }

    #[test]
    fn test_open_missing_dataset_is_backend_unavailable() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        let mut session = session(&library, ManifestPolicy::Refetch);

        let err = session.open().unwrap_err();
        assert!(matches!(err, RemoteError::BackendUnavailable { .. }));
        assert!(!session.is_open());
    }

    #[test]
    fn test_manifest_before_open_is_not_ready() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        let mut session = session(&library, ManifestPolicy::Refetch);
        assert!(matches!(session.manifest(), Err(RemoteError::NotReady(_))));
    }

    #[test]
    fn test_in_progress_frozen_once() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::InProgress);
        library.add_item(URI, "a", b"a").unwrap();

        let mut session = session(&library, ManifestPolicy::Refetch);
        session.open().unwrap();
        assert_eq!(session.state(), Some(DatasetState::InProgress));

        assert_eq!(session.manifest().unwrap().len(), 1);
        assert_eq!(session.state(), Some(DatasetState::Frozen));
        session.manifest().unwrap();
        session.manifest().unwrap();

        assert_eq!(library.freeze_count(URI), 1);
        assert_eq!(session.freeze_transitions(), 1);
    }

    #[test]
    fn test_externally_frozen_not_frozen_again() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::InProgress);

        let mut session = session(&library, ManifestPolicy::Refetch);
        session.open().unwrap();
        library.freeze_externally(URI).unwrap();

        session.manifest().unwrap();
        assert_eq!(library.freeze_count(URI), 0);
        assert_eq!(session.freeze_transitions(), 1);
    }

    #[test]
    fn test_refetch_policy() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);

        let mut session = session(&library, ManifestPolicy::Refetch);
        session.open().unwrap();
        session.manifest().unwrap();
        session.manifest().unwrap();
        assert_eq!(library.manifest_calls(URI), 2);
    }

    #[test]
    fn test_cache_frozen_policy() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);

        let mut session = session(&library, ManifestPolicy::CacheFrozen);
        session.open().unwrap();
        session.manifest().unwrap();
        session.manifest().unwrap();
        assert_eq!(library.manifest_calls(URI), 1);
    }
}
