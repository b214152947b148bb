// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Retrieval URLs
//!
//! `dtool:<dataset-uri>/<item-identifier>`. The dataset URI may itself
//! contain `/` (and usually does), so the identifier is split off at the
//! last one.

use std::fmt;
use thiserror::Error;

/// URL scheme claimed by this remote
pub const RETRIEVAL_SCHEME: &str = "dtool";

/// Why a string is not a retrieval URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// Does not start with `dtool:`
    #[error("not a dtool: URL")]
    WrongScheme,

    /// No `/` between dataset URI and identifier
    #[error("no item identifier separator")]
    MissingSeparator,

    /// Nothing before the last `/`
    #[error("empty dataset URI")]
    EmptyDatasetUri,

    /// Nothing after the last `/`
    #[error("empty item identifier")]
    EmptyItemId,
}

/// Prefix shared by every URL of a dataset, without the trailing `/`
///
/// This is what the remote passes to `GETURLS`.
pub fn dataset_prefix(dataset_uri: &str) -> String {
    format!("{}:{}", RETRIEVAL_SCHEME, dataset_uri)
}

/// A parsed retrieval URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalUrl {
    /// Dataset part, compared verbatim with the configured URI
    pub dataset_uri: String,
    /// Item identifier within the dataset
    pub item_id: String,
}

impl RetrievalUrl {
    /// Creates a URL for an item
    pub fn new(dataset_uri: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            dataset_uri: dataset_uri.into(),
            item_id: item_id.into(),
        }
    }

    /// Parses `dtool:<dataset-uri>/<item-identifier>`
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let rest = url
            .strip_prefix(RETRIEVAL_SCHEME)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or(UrlError::WrongScheme)?;
        let (dataset_uri, item_id) = rest.rsplit_once('/').ok_or(UrlError::MissingSeparator)?;

        if dataset_uri.is_empty() {
            return Err(UrlError::EmptyDatasetUri);
        }
        if item_id.is_empty() {
            return Err(UrlError::EmptyItemId);
        }
        Ok(Self::new(dataset_uri, item_id))
    }

    /// Whether the URL points into the given dataset
    pub fn belongs_to(&self, dataset_uri: &str) -> bool {
        self.dataset_uri == dataset_uri
    }
}

impl fmt::Display for RetrievalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", dataset_prefix(&self.dataset_uri), self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_uri() {
        let url = RetrievalUrl::parse("dtool:file:///data/my-ds/abc123").unwrap();
        assert_eq!(url.dataset_uri, "file:///data/my-ds");
        assert_eq!(url.item_id, "abc123");
        assert!(url.belongs_to("file:///data/my-ds"));
        assert!(!url.belongs_to("file:///data/my-ds/"));
    }

    #[test]
    fn test_parse_opaque_uri() {
        let url = RetrievalUrl::parse("dtool:my-dataset-uri/abc123").unwrap();
        assert_eq!(url, RetrievalUrl::new("my-dataset-uri", "abc123"));
        assert_eq!(url.to_string(), "dtool:my-dataset-uri/abc123");
    }

    #[test]
    fn test_malformed_urls() {
        assert_eq!(RetrievalUrl::parse("http://x/y"), Err(UrlError::WrongScheme));
        assert_eq!(RetrievalUrl::parse("dtoolx:a/b"), Err(UrlError::WrongScheme));
        assert_eq!(RetrievalUrl::parse("dtool:abc"), Err(UrlError::MissingSeparator));
        assert_eq!(RetrievalUrl::parse("dtool:/abc"), Err(UrlError::EmptyDatasetUri));
        assert_eq!(RetrievalUrl::parse("dtool:ds/"), Err(UrlError::EmptyItemId));
    }

    #[test]
    fn test_dataset_prefix() {
        assert_eq!(dataset_prefix("file:///d"), "dtool:file:///d");
    }
}
