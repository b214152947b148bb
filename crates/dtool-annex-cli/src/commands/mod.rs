// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! `dtool-annex` subcommands

pub mod import;
pub mod init_remote;
pub mod ls;

pub use import::ImportCmd;
pub use init_remote::InitRemoteCmd;
pub use ls::LsCmd;

use anyhow::{Context, Result};
use dtool_annex_dataset::{DatasetHandle, DatasetLibrary, DiskLibrary, Manifest};
use tracing::warn;

/// Opens a dataset for reading, frozen or not
///
/// Unlike the special remote, commands never freeze: a proto dataset is
/// listed from its computed manifest.
pub(crate) fn open_for_reading(uri: &str) -> Result<(Box<dyn DatasetHandle>, Manifest)> {
    let library = DiskLibrary::new();
    let handle = match library.open_dataset(uri) {
        Ok(handle) => handle,
        Err(e) if e.is_incompatible() => {
            warn!("{} is not frozen yet; its items may still change", uri);
            library
                .open_proto_dataset(uri)
                .with_context(|| format!("Failed to open dataset {}", uri))?
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to open dataset {}", uri)),
    };
    let manifest = handle
        .generate_manifest()
        .with_context(|| format!("Failed to read manifest of {}", uri))?;
    Ok((handle, manifest))
}
