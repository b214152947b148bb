// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Cross-platform path utilities for tests.

use std::path::{Path, PathBuf};

/// Cross-platform path utilities for test datasets.
pub struct TestPaths;

impl TestPaths {
    /// Normalize a path for cross-platform comparison.
    ///
    /// Uses dunce to handle Windows UNC paths (\\?\) and resolves symlinked
    /// temp directories such as `/var` → `/private/var` on macOS.
    pub fn normalize(path: &Path) -> PathBuf {
        dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Build a `file://` URI for a directory, the way dtool writes them.
    pub fn file_uri(path: &Path) -> String {
        let normalized = Self::normalize(path);
        let as_str = normalized.to_string_lossy().replace('\\', "/");
        if as_str.starts_with('/') {
            format!("file://{}", as_str)
        } else {
            format!("file:///{}", as_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_uri_has_three_slashes() {
        let temp = TempDir::new().unwrap();
        let uri = TestPaths::file_uri(temp.path());
        assert!(uri.starts_with("file:///"));
        assert!(!uri.starts_with("file:////"));
    }
}
