// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! dtool dataset fixtures.
//!
//! Writes datasets in dtool's disk layout without going through the crate
//! under test, so tests check the reader against an independent writer.

use crate::platform::TestPaths;
use md5::{Digest, Md5};
use serde_json::{json, Map, Value};
use sha1::Sha1;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One item written into a fixture dataset.
#[derive(Debug, Clone)]
pub struct FixtureItem {
    /// Path relative to `data/`
    pub relpath: String,
    /// SHA-1 of the relpath
    pub identifier: String,
    /// MD5 hex digest of the content
    pub md5: String,
    /// Raw content
    pub content: Vec<u8>,
}

impl FixtureItem {
    fn new(relpath: &str, content: &[u8]) -> Self {
        Self {
            relpath: relpath.to_string(),
            identifier: hex::encode(Sha1::digest(relpath.as_bytes())),
            md5: hex::encode(Md5::digest(content)),
            content: content.to_vec(),
        }
    }

    /// git-annex `MD5E` key for this item, extension taken from the relpath.
    pub fn annex_key(&self) -> String {
        let extension = Path::new(&self.relpath)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        format!("MD5E-s{}--{}{}", self.content.len(), self.md5, extension)
    }
}

/// Builder for [`TestDataset`].
///
/// # Example
/// ```ignore
/// use dtool_annex_test_utils::TestDatasetBuilder;
///
/// let dataset = TestDatasetBuilder::new("experiment")
///     .file("dir/file1", b"one")
///     .file("dir/file2", b"two")
///     .build_frozen();
/// println!("{}", dataset.uri());
/// ```
pub struct TestDatasetBuilder {
    name: String,
    items: Vec<FixtureItem>,
}

impl TestDatasetBuilder {
    /// Start a dataset with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
        }
    }

    /// Add a file to the dataset.
    pub fn file(mut self, relpath: &str, content: &[u8]) -> Self {
        self.items.push(FixtureItem::new(relpath, content));
        self
    }

    /// Write a frozen dataset with a manifest.
    pub fn build_frozen(self) -> TestDataset {
        let dataset = self.write("dataset");
        dataset.write_manifest();
        dataset
    }

    /// Write a proto (in-progress) dataset without a manifest.
    pub fn build_proto(self) -> TestDataset {
        self.write("protodataset")
    }

    fn write(self, kind: &str) -> TestDataset {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = TestPaths::normalize(temp.path()).join(&self.name);

        fs::create_dir_all(root.join(".dtool")).expect("Failed to create .dtool");
        fs::create_dir_all(root.join("data")).expect("Failed to create data dir");

        let mut admin = json!({
            "uuid": format!("00000000-0000-4000-8000-{:012}", self.items.len()),
            "dtoolcore_version": "3.18.2",
            "name": self.name,
            "type": kind,
            "creator_username": "tester",
            "created_at": 1_700_000_000.0,
        });
        if kind == "dataset" {
            admin["frozen_at"] = json!(1_700_000_100.0);
        }
        fs::write(
            root.join(".dtool").join("dtool"),
            serde_json::to_string_pretty(&admin).expect("Failed to serialize admin metadata"),
        )
        .expect("Failed to write admin metadata");

        for item in &self.items {
            let path = root.join("data").join(&item.relpath);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create item directory");
            }
            fs::write(&path, &item.content).expect("Failed to write item");
        }

        TestDataset {
            _temp: temp,
            uri: TestPaths::file_uri(&root),
            root,
            items: self.items,
        }
    }
}

/// A dtool dataset on disk, removed when dropped.
pub struct TestDataset {
    _temp: TempDir,
    root: PathBuf,
    uri: String,
    items: Vec<FixtureItem>,
}

impl TestDataset {
    /// Dataset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `file://` URI of the dataset.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Items in the order they were added.
    pub fn items(&self) -> &[FixtureItem] {
        &self.items
    }

    /// Look up an item by relpath.
    pub fn item(&self, relpath: &str) -> &FixtureItem {
        self.items
            .iter()
            .find(|i| i.relpath == relpath)
            .unwrap_or_else(|| panic!("no fixture item {}", relpath))
    }

    /// `dtool:<uri>/<identifier>` URL for an item.
    pub fn retrieval_url(&self, relpath: &str) -> String {
        format!("dtool:{}/{}", self.uri, self.item(relpath).identifier)
    }

    /// Path of an item's content below `data/`.
    pub fn data_path(&self, relpath: &str) -> PathBuf {
        self.root.join("data").join(relpath)
    }

    /// Add a file to a proto dataset after it was built.
    pub fn add_file(&mut self, relpath: &str, content: &[u8]) -> FixtureItem {
        let item = FixtureItem::new(relpath, content);
        let path = self.data_path(relpath);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create item directory");
        }
        fs::write(&path, content).expect("Failed to write item");
        self.items.push(item.clone());
        item
    }

    /// Freeze the dataset the way an external dtool process would.
    pub fn freeze(&self) {
        self.write_manifest();
        let admin_path = self.root.join(".dtool").join("dtool");
        let mut admin: Value = serde_json::from_str(
            &fs::read_to_string(&admin_path).expect("Failed to read admin metadata"),
        )
        .expect("Failed to parse admin metadata");
        admin["type"] = json!("dataset");
        admin["frozen_at"] = json!(1_700_000_200.0);
        fs::write(
            &admin_path,
            serde_json::to_string_pretty(&admin).expect("Failed to serialize admin metadata"),
        )
        .expect("Failed to write admin metadata");
    }

    /// Current `type` recorded in the admin metadata.
    pub fn admin_type(&self) -> String {
        let admin: Value = serde_json::from_str(
            &fs::read_to_string(self.root.join(".dtool").join("dtool"))
                .expect("Failed to read admin metadata"),
        )
        .expect("Failed to parse admin metadata");
        admin["type"].as_str().unwrap_or_default().to_string()
    }

    fn write_manifest(&self) {
        let mut items = Map::new();
        for item in &self.items {
            items.insert(
                item.identifier.clone(),
                json!({
                    "relpath": item.relpath,
                    "size_in_bytes": item.content.len(),
                    "hash": item.md5,
                    "utc_timestamp": 1_700_000_000.0,
                }),
            );
        }
        let manifest = json!({
            "dtoolcore_version": "3.18.2",
            "hash_function": "md5sum_hexdigest",
            "items": Value::Object(items),
        });
        fs::write(
            self.root.join(".dtool").join("manifest.json"),
            serde_json::to_string_pretty(&manifest).expect("Failed to serialize manifest"),
        )
        .expect("Failed to write manifest");
    }
}
