// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Queries the remote sends back to git-annex
//!
//! During a request the remote may ask git-annex for settings and for the
//! URLs it has recorded for a key. [`Tracker`] abstracts that channel so the
//! responder can be driven by the line protocol or by [`MemoryTracker`] in
//! tests.

use crate::error::{RemoteError, RemoteResult};
use std::collections::HashMap;

/// The git-annex side of the conversation
pub trait Tracker {
    /// Value of a remote setting, `None` when unset or empty
    fn get_config(&mut self, name: &str) -> RemoteResult<Option<String>>;

    /// URLs recorded for `key` that start with `prefix`
    fn get_urls(&mut self, key: &str, prefix: &str) -> RemoteResult<Vec<String>>;

    /// Sends a debug message to git-annex
    fn debug(&mut self, message: &str);
}

/// In-memory tracker for testing
#[derive(Debug, Default, Clone)]
pub struct MemoryTracker {
    config: HashMap<String, String>,
    urls: HashMap<String, Vec<String>>,
    fail_urls: bool,
    url_queries: Vec<(String, String)>,
    debug_messages: Vec<String>,
}

impl MemoryTracker {
    /// Creates a tracker with no settings or URLs
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker with `uri` set
    pub fn with_uri(uri: &str) -> Self {
        let mut tracker = Self::new();
        tracker.set_config("uri", uri);
        tracker
    }

    /// Sets a remote setting
    pub fn set_config(&mut self, name: &str, value: &str) {
        self.config.insert(name.to_string(), value.to_string());
    }

    /// Records a URL for a key
    pub fn add_url(&mut self, key: &str, url: &str) {
        self.urls
            .entry(key.to_string())
            .or_default()
            .push(url.to_string());
    }

    /// Makes `get_urls` fail (or succeed again)
    pub fn set_url_failure(&mut self, fail: bool) {
        self.fail_urls = fail;
    }

    /// `(key, prefix)` of every `get_urls` call
    pub fn url_queries(&self) -> &[(String, String)] {
        &self.url_queries
    }

    /// Debug messages received
    pub fn debug_messages(&self) -> &[String] {
        &self.debug_messages
    }
}

impl Tracker for MemoryTracker {
    fn get_config(&mut self, name: &str) -> RemoteResult<Option<String>> {
        Ok(self.config.get(name).filter(|v| !v.is_empty()).cloned())
    }

    fn get_urls(&mut self, key: &str, prefix: &str) -> RemoteResult<Vec<String>> {
        self.url_queries.push((key.to_string(), prefix.to_string()));
        if self.fail_urls {
            return Err(RemoteError::Tracker(format!("GETURLS {} failed", key)));
        }
        Ok(self
            .urls
            .get(key)
            .map(|urls| {
                urls.iter()
                    .filter(|u| u.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn debug(&mut self, message: &str) {
        self.debug_messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_filtered_by_prefix() {
        let mut tracker = MemoryTracker::new();
        tracker.add_url("k", "dtool:ds/1");
        tracker.add_url("k", "dtool:ds-other/2");
        tracker.add_url("k", "http://example.com/3");

        let urls = tracker.get_urls("k", "dtool:ds").unwrap();
        assert_eq!(urls, vec!["dtool:ds/1", "dtool:ds-other/2"]);
        assert!(tracker.get_urls("missing", "dtool:").unwrap().is_empty());
        assert_eq!(tracker.url_queries().len(), 2);
    }

    #[test]
    fn test_empty_config_is_unset() {
        let mut tracker = MemoryTracker::with_uri("");
        assert_eq!(tracker.get_config("uri").unwrap(), None);
        tracker.set_config("uri", "file:///d");
        assert_eq!(tracker.get_config("uri").unwrap().as_deref(), Some("file:///d"));
    }

    #[test]
    fn test_url_failure() {
        let mut tracker = MemoryTracker::new();
        tracker.set_url_failure(true);
        assert!(tracker.get_urls("k", "dtool:").is_err());
    }
}
