// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Error types for the special remote

use dtool_annex_dataset::DatasetError;
use std::fmt;
use thiserror::Error;

/// Result type for remote operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// One candidate that failed to resolve or copy
///
/// Failures are collected across every strategy of a resolution run and only
/// reported once all candidates are exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    /// Strategy that produced the candidate
    pub strategy: &'static str,
    /// Item identifier, URL or hash that was tried
    pub candidate: String,
    /// Why the candidate was rejected
    pub reason: String,
}

impl CandidateFailure {
    /// Creates a failure record
    pub fn new(
        strategy: &'static str,
        candidate: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            strategy,
            candidate: candidate.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.strategy, self.candidate, self.reason)
    }
}

fn describe_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return "no candidate matched".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error types for the special remote
#[derive(Debug, Error)]
pub enum RemoteError {
    /// A required setting is missing or a setting has an invalid value
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configured dataset cannot be opened
    #[error("Dataset {uri} unavailable: {source}")]
    BackendUnavailable {
        /// Dataset URI from the configuration
        uri: String,
        /// Error reported by the dataset library
        #[source]
        source: DatasetError,
    },

    /// No candidate produced readable content
    #[error("Failed to retrieve {key}: {}", describe_failures(.failures))]
    ContentRetrieval {
        /// Requested content key
        key: String,
        /// Every candidate failure, in the order tried
        failures: Vec<CandidateFailure>,
    },

    /// Write-path request on this read-only remote
    #[error("{0} is not supported: dtool datasets are read-only")]
    UnsupportedOperation(String),

    /// Every attempted strategy errored; presence is unknown
    #[error("Cannot determine presence of {key}: {}", describe_failures(.failures))]
    ResolutionAmbiguous {
        /// Requested content key
        key: String,
        /// Every candidate failure, in the order tried
        failures: Vec<CandidateFailure>,
    },

    /// Operation requires a prepared remote
    #[error("{0} requested before PREPARE")]
    NotReady(String),

    /// Malformed or unexpected protocol traffic
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A query to git-annex failed
    #[error("Tracker error: {0}")]
    Tracker(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset library error
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

impl RemoteError {
    /// Creates a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        RemoteError::Configuration(msg.into())
    }

    /// Creates an unsupported operation error
    pub fn unsupported<S: Into<String>>(operation: S) -> Self {
        RemoteError::UnsupportedOperation(operation.into())
    }

    /// Whether presence could not be determined
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, RemoteError::ResolutionAmbiguous { .. })
    }

    /// Candidate failures carried by the error, if any
    pub fn failures(&self) -> &[CandidateFailure] {
        match self {
            RemoteError::ContentRetrieval { failures, .. }
            | RemoteError::ResolutionAmbiguous { failures, .. } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_error_lists_failures() {
        let err = RemoteError::ContentRetrieval {
            key: "MD5E-s1--abc".to_string(),
            failures: vec![
                CandidateFailure::new("checksum", "id1", "permission denied"),
                CandidateFailure::new("url-list", "dtool:x/y", "foreign dataset x"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("MD5E-s1--abc"));
        assert!(msg.contains("checksum id1: permission denied"));
        assert!(msg.contains("url-list dtool:x/y: foreign dataset x"));
        assert_eq!(err.failures().len(), 2);
    }

    #[test]
    fn test_empty_failure_list() {
        let err = RemoteError::ContentRetrieval {
            key: "k".to_string(),
            failures: Vec::new(),
        };
        assert!(err.to_string().ends_with("no candidate matched"));
        assert!(!err.is_ambiguous());
    }

    #[test]
    fn test_ambiguous() {
        let err = RemoteError::ResolutionAmbiguous {
            key: "k".to_string(),
            failures: vec![CandidateFailure::new("checksum", "k", "manifest unreadable")],
        };
        assert!(err.is_ambiguous());
        assert!(RemoteError::unsupported("REMOVE").failures().is_empty());
    }
}
