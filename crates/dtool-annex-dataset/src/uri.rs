// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Dataset URI handling
//!
//! dtool addresses datasets on local disk as `file://<host>/<absolute path>`.
//! The host part is informational; it is dropped when mapping to a path.
//! Plain filesystem paths are accepted as well.

use crate::error::{DatasetError, DatasetResult};
use std::path::PathBuf;
use url::Url;

/// URI scheme for datasets stored on a local filesystem
pub const FILE_SCHEME: &str = "file";

/// Resolve a dataset URI to the dataset's root directory
///
/// # Errors
///
/// - `DatasetError::UnsupportedScheme` for any scheme other than `file`
/// - `DatasetError::InvalidUri` if the URI cannot be parsed or mapped to a path
///
/// # Example
///
/// ```rust
/// use dtool_annex_dataset::uri::dataset_root;
/// use std::path::PathBuf;
///
/// let root = dataset_root("file://laptop/data/my-dataset")?;
/// assert_eq!(root, PathBuf::from("/data/my-dataset"));
/// # Ok::<(), dtool_annex_dataset::DatasetError>(())
/// ```
pub fn dataset_root(uri: &str) -> DatasetResult<PathBuf> {
    if uri.trim().is_empty() {
        return Err(DatasetError::InvalidUri("URI is empty".to_string()));
    }

    if !uri.contains("://") {
        return Ok(PathBuf::from(uri));
    }

    let parsed = Url::parse(uri).map_err(|e| DatasetError::InvalidUri(format!("{}: {}", uri, e)))?;
    if parsed.scheme() != FILE_SCHEME {
        return Err(DatasetError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    let local = match parsed.host_str() {
        None | Some("") | Some("localhost") => parsed,
        Some(_) => Url::parse(&format!("file://{}", parsed.path()))
            .map_err(|e| DatasetError::InvalidUri(format!("{}: {}", uri, e)))?,
    };

    local
        .to_file_path()
        .map_err(|_| DatasetError::InvalidUri(format!("{}: not a local path", uri)))
}
