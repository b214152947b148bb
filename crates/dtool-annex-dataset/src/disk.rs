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

//! Local filesystem dataset library
//!
//! Reads datasets in dtool's disk layout:
//!
//! ```text
//! root/
//!   .dtool/
//!     dtool            admin metadata (JSON, "type": "dataset" | "protodataset")
//!     manifest.json    written when the dataset is frozen
//!   data/
//!     dir/file1        item content, addressed by relpath
//! ```
//!
//! Item content is served straight from `data/`; nothing is copied into a
//! cache, and nothing under `data/` is ever modified.
//!
//! Freezing writes `manifest.json` first and flips the admin `type` second,
//! each through a temp file and rename, so a reader never sees a frozen
//! dataset without a manifest.

use crate::error::{DatasetError, DatasetResult};
use crate::hasher::{generate_identifier, HashFamily, DEFAULT_HASH_FUNCTION};
use crate::manifest::{Manifest, ManifestItem};
use crate::uri::dataset_root;
use crate::{DatasetHandle, DatasetLibrary, DatasetState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory holding dtool's administrative files
pub const ADMIN_DIR: &str = ".dtool";

/// Admin metadata file name inside [`ADMIN_DIR`]
pub const ADMIN_FILE: &str = "dtool";

/// Manifest file name inside [`ADMIN_DIR`]
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory holding item content
pub const DATA_DIR: &str = "data";

/// dtool admin metadata (`.dtool/dtool`)
///
/// Unknown fields are kept so that rewriting the file on freeze does not
/// drop anything dtool itself recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminMetadata {
    /// Dataset UUID
    pub uuid: String,

    /// Dataset name
    pub name: String,

    /// `dataset` or `protodataset`
    #[serde(rename = "type")]
    pub kind: String,

    /// Time the dataset was frozen, seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_at: Option<f64>,

    /// Remaining fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdminMetadata {
    fn state(&self) -> DatasetResult<DatasetState> {
        match self.kind.as_str() {
            "dataset" => Ok(DatasetState::Frozen),
            "protodataset" => Ok(DatasetState::InProgress),
            other => Err(DatasetError::metadata(format!("unknown dataset type: {}", other))),
        }
    }
}

/// Opens datasets stored on a local filesystem
///
/// # Examples
///
/// ```rust,no_run
/// use dtool_annex_dataset::{DatasetLibrary, DiskLibrary};
///
/// let library = DiskLibrary::new();
/// match library.open_dataset("/data/my-dataset") {
///     Ok(dataset) => println!("opened {}", dataset.name()),
///     Err(e) if e.is_incompatible() => println!("still being written"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiskLibrary;

impl DiskLibrary {
    /// Create a new disk library
    pub fn new() -> Self {
        DiskLibrary
    }
}

impl DatasetLibrary for DiskLibrary {
    fn open_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>> {
        let dataset = DiskDataset::open(uri)?;
        if dataset.state != DatasetState::Frozen {
            return Err(DatasetError::incompatible(
                uri,
                DatasetState::Frozen.dtool_type(),
                dataset.state.dtool_type(),
            ));
        }
        Ok(Box::new(dataset))
    }

    fn open_proto_dataset(&self, uri: &str) -> DatasetResult<Box<dyn DatasetHandle>> {
        let dataset = DiskDataset::open(uri)?;
        if dataset.state != DatasetState::InProgress {
            return Err(DatasetError::incompatible(
                uri,
                DatasetState::InProgress.dtool_type(),
                dataset.state.dtool_type(),
            ));
        }
        Ok(Box::new(dataset))
    }
}

/// A dataset in dtool's disk layout
#[derive(Debug, Clone)]
pub struct DiskDataset {
    uri: String,
    root: PathBuf,
    admin: AdminMetadata,
    state: DatasetState,
}

impl DiskDataset {
    /// Open the dataset at `uri` in whatever state it is in
    pub fn open(uri: &str) -> DatasetResult<Self> {
        let root = dataset_root(uri)?;
        let admin_path = root.join(ADMIN_DIR).join(ADMIN_FILE);
        if !admin_path.is_file() {
            return Err(DatasetError::not_found(uri));
        }

        let admin = read_admin(&admin_path)?;
        let state = admin.state()?;
        debug!("Opened {} dataset {} at {}", state, admin.name, root.display());

        Ok(Self {
            uri: uri.to_string(),
            root,
            admin,
            state,
        })
    }

    /// Root directory of the dataset
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Admin metadata as last read
    pub fn admin(&self) -> &AdminMetadata {
        &self.admin
    }

    fn admin_path(&self) -> PathBuf {
        self.root.join(ADMIN_DIR).join(ADMIN_FILE)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(ADMIN_DIR).join(MANIFEST_FILE)
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    fn read_stored_manifest(&self) -> DatasetResult<Manifest> {
        let path = self.manifest_path();
        let json = fs::read_to_string(&path).map_err(|e| {
            DatasetError::metadata(format!("cannot read {}: {}", path.display(), e))
        })?;
        Manifest::from_json(&json)
    }

    /// Compute a manifest from the files currently under `data/`
    ///
    /// Files are visited in file-name order so repeated calls on an
    /// unchanged directory produce identical manifests.
    fn compute_manifest(&self) -> DatasetResult<Manifest> {
        let data_dir = self.data_dir();
        let mut manifest = Manifest::new(DEFAULT_HASH_FUNCTION);
        if !data_dir.is_dir() {
            return Ok(manifest);
        }

        let family = HashFamily::from_dtool_name(DEFAULT_HASH_FUNCTION)
            .ok_or_else(|| DatasetError::metadata("default hash function unknown"))?;

        for entry in WalkDir::new(&data_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| DatasetError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relpath = relpath_of(&data_dir, entry.path())?;
            let metadata = entry.metadata().map_err(|e| DatasetError::Io(e.into()))?;
            let utc_timestamp = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64());

            let item = ManifestItem {
                hash: family.hash_file(entry.path())?,
                size_in_bytes: Some(metadata.len()),
                utc_timestamp,
                relpath: relpath.clone(),
            };
            manifest.insert(generate_identifier(&relpath), item);
        }

        Ok(manifest)
    }
}

impl DatasetHandle for DiskDataset {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        &self.admin.name
    }

    fn state(&self) -> DatasetState {
        self.state
    }

    fn reload_state(&mut self) -> DatasetResult<DatasetState> {
        self.admin = read_admin(&self.admin_path())?;
        self.state = self.admin.state()?;
        Ok(self.state)
    }

    fn generate_manifest(&self) -> DatasetResult<Manifest> {
        match self.state {
            DatasetState::Frozen => self.read_stored_manifest(),
            DatasetState::InProgress => self.compute_manifest(),
        }
    }

    fn item_content_abspath(&self, identifier: &str) -> DatasetResult<PathBuf> {
        let manifest = self.generate_manifest()?;
        let item = manifest
            .get(identifier)
            .ok_or_else(|| DatasetError::item_not_found(identifier))?;

        let path = self.data_dir().join(&item.relpath);
        if !path.is_file() {
            return Err(DatasetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("content of item {} missing at {}", identifier, path.display()),
            )));
        }
        Ok(path)
    }

    fn freeze(&mut self) -> DatasetResult<()> {
        if self.state == DatasetState::Frozen {
            debug!("Dataset {} already frozen", self.uri);
            return Ok(());
        }

        let manifest = self.compute_manifest()?;
        write_atomic(&self.manifest_path(), manifest.to_json_pretty()?.as_bytes())?;

        let mut admin = self.admin.clone();
        admin.kind = DatasetState::Frozen.dtool_type().to_string();
        admin.frozen_at = Some(chrono::Utc::now().timestamp_millis() as f64 / 1000.0);
        write_atomic(&self.admin_path(), serde_json::to_string_pretty(&admin)?.as_bytes())?;

        self.admin = admin;
        self.state = DatasetState::Frozen;
        info!("Froze dataset {} with {} items", self.uri, manifest.len());
        Ok(())
    }
}

fn read_admin(path: &Path) -> DatasetResult<AdminMetadata> {
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json)
        .map_err(|e| DatasetError::metadata(format!("{}: {}", path.display(), e)))
}

fn relpath_of(data_dir: &Path, path: &Path) -> DatasetResult<String> {
    let relative = path
        .strip_prefix(data_dir)
        .map_err(|e| DatasetError::metadata(format!("{}: {}", path.display(), e)))?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn write_atomic(path: &Path, data: &[u8]) -> DatasetResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
