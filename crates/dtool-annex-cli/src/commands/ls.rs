// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! List dataset items with their retrieval URLs

use super::open_for_reading;
use anyhow::Result;
use clap::Args;
use dtool_annex_dataset::Manifest;
use dtool_annex_remote::RetrievalUrl;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct LsCmd {
    /// Dataset URI or path, exactly as the remote is configured with
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Print a JSON array instead of a table
    #[arg(long)]
    pub json: bool,
}

/// One listed item
#[derive(Debug, Serialize, PartialEq)]
pub struct ListedItem {
    pub identifier: String,
    pub relpath: String,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_in_bytes: Option<u64>,
    pub url: String,
}

/// Manifest entries with URLs built from `uri`, in manifest order
pub fn listed_items(uri: &str, manifest: &Manifest) -> Vec<ListedItem> {
    manifest
        .entries()
        .map(|entry| ListedItem {
            identifier: entry.identifier.to_string(),
            relpath: entry.item.relpath.clone(),
            hash: entry.item.hash.clone(),
            size_in_bytes: entry.item.size_in_bytes,
            url: RetrievalUrl::new(uri, entry.identifier).to_string(),
        })
        .collect()
}

impl LsCmd {
    pub fn execute(self) -> Result<()> {
        let (handle, manifest) = open_for_reading(&self.uri)?;
        let items = listed_items(&self.uri, &manifest);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        crate::output::header(&format!(
            "{} ({}, {} items, {})",
            handle.name(),
            handle.state(),
            items.len(),
            manifest.hash_function
        ));
        for item in &items {
            println!("{}\t{}", item.relpath, item.url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtool_annex_dataset::ManifestItem;

    #[test]
    fn test_listed_items_keep_manifest_order() {
        let mut manifest = Manifest::new("md5sum_hexdigest");
        manifest.insert("bbb", ManifestItem::new("z.txt", "h1"));
        manifest.insert("aaa", ManifestItem::new("a.txt", "h2"));

        let items = listed_items("file:///data/ds", &manifest);
        assert_eq!(items[0].relpath, "z.txt");
        assert_eq!(items[0].url, "dtool:file:///data/ds/bbb");
        assert_eq!(items[1].identifier, "aaa");
    }
}
