// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Hash functions used by dtool manifests
//!
//! dtool records the name of the function that produced every item hash in
//! the manifest (`hash_function`). Item identifiers are independent of that
//! choice: they are always the SHA-1 hex digest of the item's relpath.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Name dtool uses for MD5 hex digests
pub const MD5_HEXDIGEST: &str = "md5sum_hexdigest";

/// Name dtool uses for SHA-1 hex digests
pub const SHA1_HEXDIGEST: &str = "sha1sum_hexdigest";

/// Name dtool uses for SHA-256 hex digests
pub const SHA256_HEXDIGEST: &str = "sha256sum_hexdigest";

/// Hash function used when generating manifests for proto datasets
pub const DEFAULT_HASH_FUNCTION: &str = MD5_HEXDIGEST;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest families shared between dtool manifests and git-annex key backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFamily {
    /// MD5
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
}

impl HashFamily {
    /// Map a dtool `hash_function` name to its family
    pub fn from_dtool_name(name: &str) -> Option<Self> {
        match name {
            MD5_HEXDIGEST => Some(HashFamily::Md5),
            SHA1_HEXDIGEST => Some(HashFamily::Sha1),
            SHA256_HEXDIGEST => Some(HashFamily::Sha256),
            _ => None,
        }
    }

    /// The dtool `hash_function` name for this family
    pub fn dtool_name(&self) -> &'static str {
        match self {
            HashFamily::Md5 => MD5_HEXDIGEST,
            HashFamily::Sha1 => SHA1_HEXDIGEST,
            HashFamily::Sha256 => SHA256_HEXDIGEST,
        }
    }

    /// Hex digest of an in-memory buffer
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            HashFamily::Md5 => hex::encode(Md5::digest(data)),
            HashFamily::Sha1 => hex::encode(Sha1::digest(data)),
            HashFamily::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }

    /// Hex digest of a file, read in fixed-size blocks
    pub fn hash_file(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        match self {
            HashFamily::Md5 => digest_reader::<Md5, _>(file),
            HashFamily::Sha1 => digest_reader::<Sha1, _>(file),
            HashFamily::Sha256 => digest_reader::<Sha256, _>(file),
        }
    }
}

impl fmt::Display for HashFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dtool_name())
    }
}

fn digest_reader<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute the dtool item identifier for a relpath
///
/// # Example
///
/// ```rust
/// use dtool_annex_dataset::generate_identifier;
///
/// let id = generate_identifier("dir/file1");
/// assert_eq!(id.len(), 40);
/// ```
pub fn generate_identifier(relpath: &str) -> String {
    hex::encode(Sha1::digest(relpath.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

    #[test]
    fn test_family_names_round_trip() {
        for family in [HashFamily::Md5, HashFamily::Sha1, HashFamily::Sha256] {
            assert_eq!(HashFamily::from_dtool_name(family.dtool_name()), Some(family));
        }
        assert_eq!(HashFamily::from_dtool_name("crc32"), None);
    }

    #[test]
    fn test_empty_digests() {
        assert_eq!(HashFamily::Md5.hex_digest(b""), EMPTY_MD5);
        assert_eq!(
            HashFamily::Sha1.hex_digest(b""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            HashFamily::Sha256.hex_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_file_matches_buffer_digest() {
        let mut file = NamedTempFile::new().unwrap();
        let content = vec![7u8; READ_BUFFER_SIZE * 2 + 13];
        file.write_all(&content).unwrap();
        file.flush().unwrap();

        let from_file = HashFamily::Md5.hash_file(file.path()).unwrap();
        assert_eq!(from_file, HashFamily::Md5.hex_digest(&content));
    }

    #[test]
    fn test_identifier_is_sha1_of_relpath() {
        assert_eq!(
            generate_identifier("dir/file1"),
            HashFamily::Sha1.hex_digest(b"dir/file1")
        );
        assert_ne!(generate_identifier("a"), generate_identifier("b"));
    }
}
