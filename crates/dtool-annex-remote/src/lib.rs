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

//! # dtool-annex-remote
//!
//! A read-only git-annex external special remote backed by one dtool dataset.
//!
//! ## Overview
//!
//! git-annex starts the remote as a child process and talks to it over
//! stdin/stdout. Each request is answered from the dataset's manifest:
//!
//! - **Checksum match**: keys from hashing backends (`MD5E-s0--<md5>.txt`)
//!   are looked up by item hash
//! - **URL match**: `dtool:<dataset-uri>/<item-id>` URLs recorded with
//!   `git annex addurl` are looked up by identifier
//!
//! Content is copied out of the dataset; nothing is ever written back.
//!
//! ## Architecture
//!
//! ```text
//! git-annex ── protocol ──> DtoolRemote ──> ResolutionChain ──> Session ──> DatasetHandle
//!     ^                          │
//!     └──── GETCONFIG/GETURLS ───┘ (Tracker)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dtool_annex_dataset::DiskLibrary;
//! use dtool_annex_remote::{serve, DtoolRemote};
//! use std::sync::Arc;
//!
//! let mut remote = DtoolRemote::new(Arc::new(DiskLibrary::new()));
//! let stdin = std::io::stdin();
//! serve(&mut remote, stdin.lock(), std::io::stdout())?;
//! # Ok::<(), dtool_annex_remote::RemoteError>(())
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod protocol;
pub mod resolver;
pub mod responder;
pub mod session;
pub mod tracker;
pub mod url;

pub use config::{ClaimMode, ManifestPolicy, RemoteConfig};
pub use error::{CandidateFailure, RemoteError, RemoteResult};
pub use key::ContentKey;
pub use protocol::{serve, AnnexChannel, ProtocolServer, Reply, Request, PROTOCOL_VERSION};
pub use resolver::{
    ChecksumStrategy, ResolutionChain, ResolutionStrategy, Resolution, ResolvedItem,
    UrlListStrategy,
};
pub use responder::{Availability, DtoolRemote, RemoteState, UrlContents, REMOTE_COST};
pub use session::Session;
pub use tracker::{MemoryTracker, Tracker};
pub use url::{RetrievalUrl, RETRIEVAL_SCHEME};
