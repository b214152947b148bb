// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! git-annex content keys
//!
//! A key looks like `MD5E-s1024--d41d8cd98f00b204e9800998ecf8427e.txt`:
//! a backend name, optional `-`-prefixed fields such as the size, then `--`
//! and the key name. For hashing backends the name is the hex digest, with
//! the file extension appended by the `E` variants.

use dtool_annex_dataset::HashFamily;
use std::fmt;

/// A parsed content key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    raw: String,
    backend: String,
    hash: Option<String>,
}

impl ContentKey {
    /// Parses a key; never fails
    ///
    /// The backend is the text before the first `-`. The hash is the text
    /// after the first `--` with everything from the first `.` removed.
    /// Keys without `--` (or with nothing after it) carry no hash.
    pub fn parse(raw: &str) -> Self {
        let backend = raw.split('-').next().unwrap_or_default().to_string();
        let hash = raw
            .split_once("--")
            .map(|(_, name)| name.split('.').next().unwrap_or_default())
            .filter(|hash| !hash.is_empty())
            .map(str::to_string);

        Self {
            raw: raw.to_string(),
            backend,
            hash,
        }
    }

    /// The key as git-annex sent it
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Backend name, e.g. `MD5E`
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Hex digest carried by the key, if any
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Digest family of the backend, if it is a hashing backend this remote
    /// knows how to compare against dtool manifests
    pub fn hash_family(&self) -> Option<HashFamily> {
        match self.backend.as_str() {
            "MD5" | "MD5E" => Some(HashFamily::Md5),
            "SHA1" | "SHA1E" => Some(HashFamily::Sha1),
            "SHA256" | "SHA256E" => Some(HashFamily::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_md5e_key() {
        let key = ContentKey::parse("MD5E-s0--d41d8cd98f00b204e9800998ecf8427e.txt");
        assert_eq!(key.backend(), "MD5E");
        assert_eq!(key.hash(), Some("d41d8cd98f00b204e9800998ecf8427e"));
        assert_eq!(key.hash_family(), Some(HashFamily::Md5));
        assert_eq!(key.to_string(), "MD5E-s0--d41d8cd98f00b204e9800998ecf8427e.txt");
    }

    #[test]
    fn test_multiple_extensions_are_dropped() {
        let key = ContentKey::parse("SHA256E-s10--abcdef.tar.gz");
        assert_eq!(key.hash(), Some("abcdef"));
        assert_eq!(key.hash_family(), Some(HashFamily::Sha256));
    }

    #[test]
    fn test_key_without_extension_or_size() {
        let key = ContentKey::parse("SHA1--0123456789abcdef");
        assert_eq!(key.backend(), "SHA1");
        assert_eq!(key.hash(), Some("0123456789abcdef"));
    }

    #[test]
    fn test_non_hash_backends() {
        let key = ContentKey::parse("URL--dtool:file:///data/ds/abc");
        assert_eq!(key.backend(), "URL");
        assert_eq!(key.hash_family(), None);

        let key = ContentKey::parse("WORM-s3-m1700000000--notes");
        assert_eq!(key.backend(), "WORM");
        assert_eq!(key.hash_family(), None);
    }

    #[test]
    fn test_malformed_keys_have_no_hash() {
        assert_eq!(ContentKey::parse("garbage").hash(), None);
        assert_eq!(ContentKey::parse("garbage").backend(), "garbage");
        assert_eq!(ContentKey::parse("MD5E-s0--").hash(), None);
        assert_eq!(ContentKey::parse("MD5E-s0--.txt").hash(), None);
        assert_eq!(ContentKey::parse("").backend(), "");
    }
}
