// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! The special remote's callback surface
//!
//! [`DtoolRemote`] moves through three states:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --prepare--> Ready
//! ```
//!
//! Lookups and retrievals require `Ready`. Every write-path callback fails
//! with [`RemoteError::UnsupportedOperation`] without touching the dataset.

use crate::config::{ClaimMode, RemoteConfig};
use crate::error::{CandidateFailure, RemoteError, RemoteResult};
use crate::key::ContentKey;
use crate::resolver::{Candidate, Resolution, ResolutionChain, ResolvedItem};
use crate::session::Session;
use crate::tracker::Tracker;
use crate::url::{dataset_prefix, RetrievalUrl, RETRIEVAL_SCHEME};
use dtool_annex_dataset::DatasetLibrary;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cost reported to git-annex
///
/// git-annex treats 100 as cheap and 200 as expensive; datasets are read
/// from wherever the URI points, so this remote asks to be tried last.
pub const REMOTE_COST: u32 = 1000;

/// Name under which export retrieval failures are recorded
const EXPORT_LOOKUP: &str = "export-path";

/// Whether content is reachable from other machines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Reachable from anywhere
    Global,
    /// Only reachable from this machine
    Local,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Global => f.write_str("GLOBAL"),
            Availability::Local => f.write_str("LOCAL"),
        }
    }
}

/// Lifecycle of a [`DtoolRemote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// No configuration read yet
    Uninitialized,
    /// Configuration bound, dataset not open
    Initialized,
    /// Dataset open
    Ready,
}

/// What `CHECKURL` can tell about a URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlContents {
    /// Size in bytes, if the manifest records it
    pub size: Option<u64>,
    /// Suggested file name
    pub name: Option<String>,
}

/// Read-only special remote backed by one dtool dataset
#[derive(Debug)]
pub struct DtoolRemote {
    library: Arc<dyn DatasetLibrary>,
    chain: ResolutionChain,
    session: Option<Session>,
    state: RemoteState,
}

impl DtoolRemote {
    /// Creates a remote opening datasets through `library`
    pub fn new(library: Arc<dyn DatasetLibrary>) -> Self {
        Self::with_chain(library, ResolutionChain::default())
    }

    /// Creates a remote with a custom resolution chain
    pub fn with_chain(library: Arc<dyn DatasetLibrary>, chain: ResolutionChain) -> Self {
        Self {
            library,
            chain,
            session: None,
            state: RemoteState::Uninitialized,
        }
    }

    /// Current state
    pub fn state(&self) -> RemoteState {
        self.state
    }

    /// Session, once initialized
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Bound configuration, once initialized
    pub fn config(&self) -> Option<&RemoteConfig> {
        self.session.as_ref().map(Session::config)
    }

    /// Reads and validates the settings
    ///
    /// # Errors
    ///
    /// `RemoteError::Configuration` if `uri` is missing or a setting is
    /// invalid.
    pub fn initialize(&mut self, tracker: &mut dyn Tracker) -> RemoteResult<()> {
        let config = RemoteConfig::from_tracker(tracker)?;
        debug!("Set dtool dataset uri={}", config.uri);
        self.session = Some(Session::new(config, Arc::clone(&self.library)));
        self.state = RemoteState::Initialized;
        Ok(())
    }

    /// Opens the dataset, initializing first if needed
    ///
    /// # Errors
    ///
    /// `RemoteError::BackendUnavailable` if the dataset cannot be opened.
    pub fn prepare(&mut self, tracker: &mut dyn Tracker) -> RemoteResult<()> {
        if self.state == RemoteState::Uninitialized {
            self.initialize(tracker)?;
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RemoteError::configuration("no configuration bound"))?;
        session.open()?;
        info!("Prepared dtool remote for {}", session.uri());
        self.state = RemoteState::Ready;
        Ok(())
    }

    fn ready_session(&mut self, operation: &str) -> RemoteResult<&mut Session> {
        match (self.state, self.session.as_mut()) {
            (RemoteState::Ready, Some(session)) => Ok(session),
            _ => Err(RemoteError::NotReady(operation.to_string())),
        }
    }

    fn ready_config(&self) -> Option<&RemoteConfig> {
        match self.state {
            RemoteState::Ready => self.config(),
            _ => None,
        }
    }

    /// Whether this remote takes responsibility for `url`
    ///
    /// Pure. Returns false before the remote is ready.
    pub fn claim_url(&self, url: &str) -> bool {
        let Some(config) = self.ready_config() else {
            return false;
        };
        let claimed = match config.claim_mode {
            ClaimMode::Dataset => url.starts_with(&format!("{}/", dataset_prefix(&config.uri))),
            ClaimMode::Scheme => url.starts_with(&format!("{}:", RETRIEVAL_SCHEME)),
        };
        debug!("Check claim to URL {}: {}", url, claimed);
        claimed
    }

    /// Whether `url` can be retrieved from this remote
    ///
    /// True for every claimed URL, and also for any well-formed retrieval
    /// URL of the bound dataset.
    pub fn check_url(&self, url: &str) -> bool {
        if self.claim_url(url) {
            return true;
        }
        match (self.ready_config(), RetrievalUrl::parse(url)) {
            (Some(config), Ok(parsed)) => parsed.belongs_to(&config.uri),
            _ => false,
        }
    }

    /// Size and suggested name for a checkable URL
    ///
    /// Best effort: `None` when the URL does not point into the bound dataset
    /// or the manifest cannot be read.
    pub fn describe_url(&mut self, url: &str) -> Option<UrlContents> {
        let parsed = RetrievalUrl::parse(url).ok()?;
        let session = self.ready_session("CHECKURL").ok()?;
        if !parsed.belongs_to(session.uri()) {
            return None;
        }
        let manifest = session
            .manifest()
            .map_err(|e| debug!("Cannot describe {}: {}", url, e))
            .ok()?;
        let item = manifest.get(&parsed.item_id)?;
        Some(UrlContents {
            size: item.size_in_bytes,
            name: item.relpath.rsplit('/').next().map(str::to_string),
        })
    }

    fn presence(&mut self, key: &ContentKey, tracker: &mut dyn Tracker) -> RemoteResult<Option<ResolvedItem>> {
        let chain = &self.chain;
        let session = match (self.state, self.session.as_mut()) {
            (RemoteState::Ready, Some(session)) => session,
            _ => return Err(RemoteError::NotReady("CHECKPRESENT".to_string())),
        };

        match chain.resolve(session, key, tracker, &mut |_, _| Ok(())) {
            Resolution::Found(item) => Ok(Some(item)),
            Resolution::NotFound {
                failures,
                all_errored: true,
                ..
            } => Err(RemoteError::ResolutionAmbiguous {
                key: key.to_string(),
                failures,
            }),
            Resolution::NotFound { .. } => Ok(None),
        }
    }

    /// Whether the key's content is in the dataset
    ///
    /// # Errors
    ///
    /// `RemoteError::ResolutionAmbiguous` if every attempted strategy failed
    /// without a clean answer; the caller should report "unknown" rather
    /// than absent.
    pub fn check_present(&mut self, key: &str, tracker: &mut dyn Tracker) -> RemoteResult<bool> {
        let key = ContentKey::parse(key);
        let present = self.presence(&key, tracker)?.is_some();
        debug!("{} present: {}", key, present);
        Ok(present)
    }

    /// Relpath of the item `key` resolves to
    pub fn whereis(&mut self, key: &str, tracker: &mut dyn Tracker) -> RemoteResult<Option<String>> {
        let key = ContentKey::parse(key);
        Ok(self.presence(&key, tracker)?.map(|item| item.relpath))
    }

    /// Copies the key's content to `dest`
    ///
    /// Candidates are tried in resolution order; a candidate whose content
    /// cannot be copied is recorded and the next one is tried.
    ///
    /// # Errors
    ///
    /// `RemoteError::ContentRetrieval` with every candidate failure when
    /// nothing could be copied.
    pub fn transfer_retrieve(
        &mut self,
        key: &str,
        dest: &Path,
        tracker: &mut dyn Tracker,
    ) -> RemoteResult<()> {
        let key = ContentKey::parse(key);
        let chain = &self.chain;
        let session = match (self.state, self.session.as_mut()) {
            (RemoteState::Ready, Some(session)) => session,
            _ => return Err(RemoteError::NotReady("TRANSFER RETRIEVE".to_string())),
        };

        let mut copy = |session: &mut Session, candidate: &Candidate| -> RemoteResult<()> {
            let path = session.content_path(&candidate.item_id)?;
            debug!("Cached item content at {}", path.display());
            fs::copy(&path, dest)?;
            Ok(())
        };

        match chain.resolve(session, &key, tracker, &mut copy) {
            Resolution::Found(item) => {
                info!("Retrieved {} from item {} ({})", key, item.item_id, item.relpath);
                Ok(())
            }
            Resolution::NotFound { failures, .. } => {
                warn!("Failed to retrieve {}: {} failures", key, failures.len());
                Err(RemoteError::ContentRetrieval {
                    key: key.to_string(),
                    failures,
                })
            }
        }
    }

    /// Copies the item exported at `remote_path` to `dest`
    ///
    /// Only relpath equality is used; the key is not consulted for matching.
    /// The first manifest entry with the relpath wins.
    pub fn transfer_export_retrieve(
        &mut self,
        key: &str,
        dest: &Path,
        remote_path: &str,
    ) -> RemoteResult<()> {
        let session = self.ready_session("TRANSFEREXPORT RETRIEVE")?;
        let retrieval_error = |candidate: &str, reason: &dyn fmt::Display| RemoteError::ContentRetrieval {
            key: key.to_string(),
            failures: vec![CandidateFailure::new(EXPORT_LOOKUP, candidate, reason)],
        };

        let manifest = session
            .manifest()
            .map_err(|e| retrieval_error(remote_path, &e))?;
        let entry = manifest
            .entry_with_relpath(remote_path)
            .ok_or_else(|| retrieval_error(remote_path, &"no item with this relpath"))?;

        let path = session
            .content_path(entry.identifier)
            .map_err(|e| retrieval_error(entry.identifier, &e))?;
        fs::copy(&path, dest).map_err(|e| retrieval_error(entry.identifier, &e))?;
        info!("Retrieved export {} from item {}", remote_path, entry.identifier);
        Ok(())
    }

    /// Cost reported to git-annex
    pub fn get_cost(&self) -> u32 {
        REMOTE_COST
    }

    /// Availability reported to git-annex
    pub fn get_availability(&self) -> Availability {
        Availability::Global
    }

    /// Key/value pairs for `GETINFO`
    pub fn info(&self) -> Vec<(String, String)> {
        let mut info = Vec::new();
        if let Some(session) = &self.session {
            info.push(("dataset uri".to_string(), session.uri().to_string()));
            info.push(("claim mode".to_string(), session.config().claim_mode.to_string()));
            if let Some(name) = session.dataset_name() {
                info.push(("dataset name".to_string(), name.to_string()));
            }
            if let Some(state) = session.state() {
                info.push(("dataset state".to_string(), state.to_string()));
            }
        }
        info
    }

    /// Unsupported: datasets are read-only
    pub fn transfer_store(&mut self, _key: &str, _file: &Path) -> RemoteResult<()> {
        Err(RemoteError::unsupported("TRANSFER STORE"))
    }

    /// Unsupported: datasets are read-only
    pub fn remove(&mut self, _key: &str) -> RemoteResult<()> {
        Err(RemoteError::unsupported("REMOVE"))
    }

    /// Unsupported: datasets are read-only
    pub fn transfer_export_store(&mut self, _key: &str, _file: &Path, _remote_path: &str) -> RemoteResult<()> {
        Err(RemoteError::unsupported("TRANSFEREXPORT STORE"))
    }

    /// Unsupported
    pub fn check_present_export(&mut self, _key: &str, _remote_path: &str) -> RemoteResult<bool> {
        Err(RemoteError::unsupported("CHECKPRESENTEXPORT"))
    }

    /// Unsupported: datasets are read-only
    pub fn remove_export(&mut self, _key: &str, _remote_path: &str) -> RemoteResult<()> {
        Err(RemoteError::unsupported("REMOVEEXPORT"))
    }

    /// Unsupported: datasets are read-only
    pub fn remove_export_directory(&mut self, _remote_dir: &str) -> RemoteResult<()> {
        Err(RemoteError::unsupported("REMOVEEXPORTDIRECTORY"))
    }

    /// Unsupported: datasets are read-only
    pub fn rename_export(&mut self, _key: &str, _from: &str, _to: &str) -> RemoteResult<()> {
        Err(RemoteError::unsupported("RENAMEEXPORT"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MemoryTracker;
    use dtool_annex_dataset::{DatasetState, MemoryLibrary};
    use tempfile::TempDir;

    const URI: &str = "my-dataset-uri";

    fn ready_remote(library: &MemoryLibrary, tracker: &mut MemoryTracker) -> DtoolRemote {
        let mut remote = DtoolRemote::new(Arc::new(library.clone()));
        remote.prepare(tracker).unwrap();
        remote
    }

    #[test]
    fn test_state_transitions() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let mut tracker = MemoryTracker::with_uri(URI);

        let mut remote = DtoolRemote::new(Arc::new(library.clone()));
        assert_eq!(remote.state(), RemoteState::Uninitialized);
        remote.initialize(&mut tracker).unwrap();
        assert_eq!(remote.state(), RemoteState::Initialized);
        remote.prepare(&mut tracker).unwrap();
        assert_eq!(remote.state(), RemoteState::Ready);
    }

    #[test]
    fn test_initialize_without_uri() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        let mut remote = DtoolRemote::new(Arc::new(library));

        let err = remote.initialize(&mut MemoryTracker::new()).unwrap_err();
        assert!(matches!(err, RemoteError::Configuration(_)));
        assert_eq!(remote.state(), RemoteState::Uninitialized);
    }

    #[test]
    fn test_prepare_unopenable_dataset() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        let mut remote = DtoolRemote::new(Arc::new(library));

        let err = remote.prepare(&mut MemoryTracker::with_uri(URI)).unwrap_err();
        assert!(matches!(err, RemoteError::BackendUnavailable { .. }));
        assert_ne!(remote.state(), RemoteState::Ready);
    }

    #[test]
    fn test_operations_before_prepare() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let mut tracker = MemoryTracker::with_uri(URI);
        let mut remote = DtoolRemote::new(Arc::new(library));
        remote.initialize(&mut tracker).unwrap();

        assert!(!remote.claim_url("dtool:my-dataset-uri/abc"));
        assert!(matches!(
            remote.check_present("MD5-s0--abc", &mut tracker),
            Err(RemoteError::NotReady(_))
        ));
        let dest = temp.path().join("out");
        assert!(matches!(
            remote.transfer_retrieve("MD5-s0--abc", &dest, &mut tracker),
            Err(RemoteError::NotReady(_))
        ));
    }

    #[test]
    fn test_claim_modes() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);

        let mut tracker = MemoryTracker::with_uri(URI);
        let remote = ready_remote(&library, &mut tracker);
        assert!(remote.claim_url("dtool:my-dataset-uri/abc"));
        assert!(!remote.claim_url("dtool:other/abc"));
        assert!(!remote.claim_url("dtool:my-dataset-uri"));

        tracker.set_config("claim-mode", "scheme");
        let remote = ready_remote(&library, &mut tracker);
        assert!(remote.claim_url("dtool:other/abc"));
        assert!(!remote.claim_url("https://example.com/abc"));
    }

    #[test]
    fn test_check_url_is_superset_of_claim() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let mut tracker = MemoryTracker::with_uri(URI);
        let remote = ready_remote(&library, &mut tracker);

        for url in ["dtool:my-dataset-uri/abc", "dtool:other/abc", "dtool:", "x"] {
            if remote.claim_url(url) {
                assert!(remote.check_url(url), "{}", url);
            }
        }
        assert!(remote.check_url("dtool:my-dataset-uri/abc"));
        assert!(!remote.check_url("dtool:other/abc"));
    }

    #[test]
    fn test_describe_url() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let id = library.add_item(URI, "dir/file1.txt", b"hello").unwrap();
        let mut tracker = MemoryTracker::with_uri(URI);
        let mut remote = ready_remote(&library, &mut tracker);

        let contents = remote
            .describe_url(&format!("dtool:{}/{}", URI, id))
            .unwrap();
        assert_eq!(contents.size, Some(5));
        assert_eq!(contents.name.as_deref(), Some("file1.txt"));
        assert!(remote.describe_url("dtool:my-dataset-uri/nope").is_none());
        assert!(remote.describe_url("dtool:other/nope").is_none());
    }

    #[test]
    fn test_cost_and_availability() {
        let temp = TempDir::new().unwrap();
        let remote = DtoolRemote::new(Arc::new(MemoryLibrary::new(temp.path())));
        assert_eq!(remote.get_cost(), REMOTE_COST);
        assert_eq!(remote.get_availability(), Availability::Global);
        assert_eq!(Availability::Global.to_string(), "GLOBAL");
    }

    #[test]
    fn test_write_path_unsupported() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset(URI, DatasetState::Frozen);
        let mut tracker = MemoryTracker::with_uri(URI);
        let mut remote = ready_remote(&library, &mut tracker);
        let file = temp.path().join("f");

        let results = [
            remote.transfer_store("k", &file),
            remote.remove("k"),
            remote.transfer_export_store("k", &file, "a"),
            remote.remove_export("k", "a"),
            remote.remove_export_directory("a"),
            remote.rename_export("k", "a", "b"),
        ];
        for result in results {
            assert!(matches!(result, Err(RemoteError::UnsupportedOperation(_))));
        }
        assert!(remote.check_present_export("k", "a").is_err());
        assert_eq!(library.manifest_calls(URI), 0);
    }

    #[test]
    fn test_info() {
        let temp = TempDir::new().unwrap();
        let library = MemoryLibrary::new(temp.path());
        library.create_dataset("mem://datasets/ds", DatasetState::Frozen);
        let mut tracker = MemoryTracker::with_uri("mem://datasets/ds");
        let remote = ready_remote(&library, &mut tracker);

        let info = remote.info();
        assert!(info.contains(&("dataset name".to_string(), "ds".to_string())));
        assert!(info.contains(&("dataset state".to_string(), "frozen".to_string())));
    }
}
