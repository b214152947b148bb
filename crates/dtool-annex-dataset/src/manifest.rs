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

//! Dataset manifests
//!
//! A manifest is a point-in-time index of a dataset's items. dtool writes it
//! to `.dtool/manifest.json` when a dataset is frozen:
//!
//! ```text
//! {
//!   "dtoolcore_version": "3.18.2",
//!   "hash_function": "md5sum_hexdigest",
//!   "items": {
//!     "<sha1 of relpath>": {
//!       "relpath": "dir/file1",
//!       "size_in_bytes": 3,
//!       "hash": "f97c5d29941bfb1b2fdab0874906ab82",
//!       "utc_timestamp": 1700000000.0
//!     }
//!   }
//! }
//! ```
//!
//! Item order is kept exactly as the JSON document lists it. Nothing in this
//! crate sorts entries, so callers that scan for a match see the dataset
//! library's order. Lookups by identifier do not scan.

use crate::error::{DatasetError, DatasetResult};
use crate::hasher::HashFamily;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata recorded for one dataset item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Path of the item relative to the dataset's data directory
    pub relpath: String,

    /// Hex digest produced by the manifest's hash function
    pub hash: String,

    /// Size of the item in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,

    /// Modification time as seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_timestamp: Option<f64>,
}

impl ManifestItem {
    /// Creates an item with only the required fields
    pub fn new(relpath: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            relpath: relpath.into(),
            hash: hash.into(),
            size_in_bytes: None,
            utc_timestamp: None,
        }
    }
}

/// An item together with its identifier, borrowed from a [`Manifest`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifestEntry<'a> {
    /// Item identifier, unique within the dataset
    pub identifier: &'a str,
    /// Item metadata
    pub item: &'a ManifestItem,
}

/// Snapshot of a dataset's item index
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// dtoolcore version that wrote the manifest, if recorded
    pub dtoolcore_version: Option<String>,

    /// Name of the hash function used for item hashes
    pub hash_function: String,

    items: IndexMap<String, ManifestItem>,
}

#[derive(Serialize, Deserialize)]
struct RawManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dtoolcore_version: Option<String>,
    hash_function: String,
    items: Map<String, Value>,
}

impl Manifest {
    /// Creates an empty manifest for the given hash function
    pub fn new(hash_function: impl Into<String>) -> Self {
        Self {
            dtoolcore_version: None,
            hash_function: hash_function.into(),
            items: IndexMap::new(),
        }
    }

    /// Appends an item
    ///
    /// An existing entry with the same identifier is replaced in place, so
    /// identifiers stay unique and keep their original position.
    pub fn insert(&mut self, identifier: impl Into<String>, item: ManifestItem) {
        self.items.insert(identifier.into(), item);
    }

    /// Entries in manifest order
    pub fn entries(&self) -> impl ExactSizeIterator<Item = ManifestEntry<'_>> + '_ {
        self.items
            .iter()
            .map(|(identifier, item)| ManifestEntry {
                identifier: identifier.as_str(),
                item,
            })
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the manifest lists no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by identifier
    pub fn get(&self, identifier: &str) -> Option<&ManifestItem> {
        self.items.get(identifier)
    }

    /// Whether an item with the identifier exists
    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// All entries whose hash equals `hash`, in manifest order
    pub fn entries_with_hash<'a>(
        &'a self,
        hash: &'a str,
    ) -> impl Iterator<Item = ManifestEntry<'a>> + 'a {
        self.entries().filter(move |e| e.item.hash == hash)
    }

    /// First entry whose relpath equals `relpath`
    pub fn entry_with_relpath(&self, relpath: &str) -> Option<ManifestEntry<'_>> {
        self.entries().find(|e| e.item.relpath == relpath)
    }

    /// Digest family of the manifest's hash function, if known
    pub fn hash_family(&self) -> Option<HashFamily> {
        HashFamily::from_dtool_name(&self.hash_function)
    }

    /// Parses a manifest from its JSON representation
    pub fn from_json(json: &str) -> DatasetResult<Self> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let mut manifest = Manifest::new(raw.hash_function);
        manifest.dtoolcore_version = raw.dtoolcore_version;
        manifest.items.reserve(raw.items.len());

        for (identifier, value) in raw.items {
            let item: ManifestItem = serde_json::from_value(value).map_err(|e| {
                DatasetError::metadata(format!("manifest item {}: {}", identifier, e))
            })?;
            manifest.items.insert(identifier, item);
        }

        Ok(manifest)
    }

    /// Serializes the manifest as pretty-printed JSON
    pub fn to_json_pretty(&self) -> DatasetResult<String> {
        let mut items = Map::new();
        for (identifier, item) in &self.items {
            items.insert(identifier.clone(), serde_json::to_value(item)?);
        }
        let raw = RawManifest {
            dtoolcore_version: self.dtoolcore_version.clone(),
            hash_function: self.hash_function.clone(),
            items,
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}
