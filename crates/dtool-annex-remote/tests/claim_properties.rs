// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Property tests for URL claiming

use dtool_annex_dataset::{DatasetState, MemoryLibrary};
use dtool_annex_remote::{ContentKey, DtoolRemote, MemoryTracker, RetrievalUrl};
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

const URI: &str = "file:///data/ds";

fn ready_remote(claim_mode: &str) -> (TempDir, DtoolRemote) {
    let temp = TempDir::new().unwrap();
    let library = MemoryLibrary::new(temp.path());
    library.create_dataset(URI, DatasetState::Frozen);
    let mut tracker = MemoryTracker::with_uri(URI);
    tracker.set_config("claim-mode", claim_mode);
    let mut remote = DtoolRemote::new(Arc::new(library));
    remote.prepare(&mut tracker).unwrap();
    (temp, remote)
}

fn url_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]{1,40}".prop_map(|id| format!("dtool:{}/{}", URI, id)),
        "[a-z0-9/:._-]{0,40}".prop_map(|rest| format!("dtool:{}", rest)),
        "[a-z]{1,8}://[a-z0-9./-]{0,40}",
        ".{0,60}",
    ]
}

proptest! {
    #[test]
    fn prop_claimed_urls_are_checkable(url in url_strategy()) {
        for mode in ["dataset", "scheme"] {
            let (_temp, remote) = ready_remote(mode);
            if remote.claim_url(&url) {
                prop_assert!(remote.check_url(&url), "{} claimed but not checkable in {} mode", url, mode);
            }
        }
    }

    #[test]
    fn prop_urls_of_bound_dataset_are_claimed(id in "[a-f0-9]{40}") {
        let url = RetrievalUrl::new(URI, &id).to_string();
        for mode in ["dataset", "scheme"] {
            let (_temp, remote) = ready_remote(mode);
            prop_assert!(remote.claim_url(&url));
        }
    }

    #[test]
    fn prop_key_parse_is_total(raw in ".{0,80}") {
        let key = ContentKey::parse(&raw);
        prop_assert_eq!(key.as_str(), raw.as_str());
        if let Some(hash) = key.hash() {
            prop_assert!(!hash.is_empty());
            prop_assert!(!hash.contains('.'));
        }
    }
}
