// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Remote settings
//!
//! git-annex stores the settings given to `initremote` and hands them back
//! through `GETCONFIG`:
//!
//! ```text
//! git annex initremote dtool type=external externaltype=dtool \
//!     encryption=none uri=file:///data/my-dataset claim-mode=scheme
//! ```

use crate::error::{RemoteError, RemoteResult};
use crate::tracker::Tracker;
use std::fmt;
use std::str::FromStr;

/// Setting holding the dataset URI
pub const URI_SETTING: &str = "uri";

/// Setting selecting [`ClaimMode`]
pub const CLAIM_MODE_SETTING: &str = "claim-mode";

/// Setting selecting [`ManifestPolicy`]
pub const MANIFEST_CACHE_SETTING: &str = "manifest-cache";

/// Settings and their descriptions, as reported by `LISTCONFIGS`
pub const SETTINGS: &[(&str, &str)] = &[
    (URI_SETTING, "dtool dataset URI (required)"),
    (
        CLAIM_MODE_SETTING,
        "which dtool: URLs to claim: dataset (this dataset only, default) or scheme (all)",
    ),
    (
        MANIFEST_CACHE_SETTING,
        "keep the manifest of a frozen dataset for the whole session: yes or no (default)",
    ),
];

/// Which URLs `CLAIMURL` accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimMode {
    /// Only `dtool:<uri>/...` URLs of the configured dataset
    #[default]
    Dataset,
    /// Every `dtool:` URL
    Scheme,
}

impl ClaimMode {
    /// Setting value for this mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimMode::Dataset => "dataset",
            ClaimMode::Scheme => "scheme",
        }
    }
}

impl FromStr for ClaimMode {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dataset" => Ok(ClaimMode::Dataset),
            "scheme" => Ok(ClaimMode::Scheme),
            _ => Err(RemoteError::configuration(format!(
                "invalid {} '{}': expected dataset or scheme",
                CLAIM_MODE_SETTING, s
            ))),
        }
    }
}

impl fmt::Display for ClaimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When manifests are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestPolicy {
    /// Fetch on every access
    #[default]
    Refetch,
    /// Keep a frozen dataset's manifest for the session
    CacheFrozen,
}

impl ManifestPolicy {
    fn parse(value: &str) -> RemoteResult<Self> {
        match value.to_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(ManifestPolicy::CacheFrozen),
            "no" | "false" | "0" => Ok(ManifestPolicy::Refetch),
            _ => Err(RemoteError::configuration(format!(
                "invalid {} '{}': expected yes or no",
                MANIFEST_CACHE_SETTING, value
            ))),
        }
    }
}

/// Settings bound to one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Dataset URI, compared verbatim with retrieval URLs
    pub uri: String,
    /// Which URLs to claim
    pub claim_mode: ClaimMode,
    /// Manifest caching
    pub manifest_policy: ManifestPolicy,
}

impl RemoteConfig {
    /// Creates a configuration with default optional settings
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            claim_mode: ClaimMode::default(),
            manifest_policy: ManifestPolicy::default(),
        }
    }

    /// Sets the claim mode
    pub fn with_claim_mode(mut self, claim_mode: ClaimMode) -> Self {
        self.claim_mode = claim_mode;
        self
    }

    /// Sets the manifest policy
    pub fn with_manifest_policy(mut self, manifest_policy: ManifestPolicy) -> Self {
        self.manifest_policy = manifest_policy;
        self
    }

    /// Reads all settings from git-annex
    ///
    /// # Errors
    ///
    /// `RemoteError::Configuration` if `uri` is unset or empty, or an
    /// optional setting has an invalid value.
    pub fn from_tracker(tracker: &mut dyn Tracker) -> RemoteResult<Self> {
        let uri = tracker
            .get_config(URI_SETTING)?
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| RemoteError::configuration("You need to set uri="))?;

        let mut config = Self::new(uri);
        if let Some(mode) = tracker.get_config(CLAIM_MODE_SETTING)? {
            config.claim_mode = mode.parse()?;
        }
        if let Some(cache) = tracker.get_config(MANIFEST_CACHE_SETTING)? {
            config.manifest_policy = ManifestPolicy::parse(&cache)?;
        }
        Ok(config)
    }
}
