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

//! Dataset error types and utilities

use std::io;
use thiserror::Error;

/// Result type alias for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors that can occur while opening or reading a dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    /// No dataset exists at the given URI
    #[error("dataset not found: {0}")]
    NotFound(String),

    /// The dataset exists but is not of the requested kind
    /// (a proto dataset opened as frozen, or the reverse)
    #[error("dataset at {uri} is a {found}, expected a {expected}")]
    Incompatible {
        /// URI of the dataset
        uri: String,
        /// Kind that was requested
        expected: String,
        /// Kind found in the admin metadata
        found: String,
    },

    /// The URI could not be parsed
    #[error("invalid dataset URI: {0}")]
    InvalidUri(String),

    /// The URI uses a storage scheme this library cannot open
    #[error("unsupported dataset URI scheme: {0}")]
    UnsupportedScheme(String),

    /// Admin metadata or manifest is missing or malformed
    #[error("invalid dataset metadata: {0}")]
    Metadata(String),

    /// No item with the given identifier exists in the dataset
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatasetError {
    /// Create a NotFound error for the given URI
    pub fn not_found<S: Into<String>>(uri: S) -> Self {
        DatasetError::NotFound(uri.into())
    }

    /// Create an Incompatible error
    pub fn incompatible<U, E, F>(uri: U, expected: E, found: F) -> Self
    where
        U: Into<String>,
        E: Into<String>,
        F: Into<String>,
    {
        DatasetError::Incompatible {
            uri: uri.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a Metadata error with context
    pub fn metadata<S: Into<String>>(msg: S) -> Self {
        DatasetError::Metadata(msg.into())
    }

    /// Create an ItemNotFound error for the given identifier
    pub fn item_not_found<S: Into<String>>(identifier: S) -> Self {
        DatasetError::ItemNotFound(identifier.into())
    }

    /// Check if this is an Incompatible error
    pub fn is_incompatible(&self) -> bool {
        matches!(self, DatasetError::Incompatible { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatasetError::NotFound(_))
    }

    /// Check if this is an ItemNotFound error
    pub fn is_item_not_found(&self) -> bool {
        matches!(self, DatasetError::ItemNotFound(_))
    }
}
