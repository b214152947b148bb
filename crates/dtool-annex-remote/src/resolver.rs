// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Key to item resolution
//!
//! A [`ResolutionChain`] runs its strategies in a fixed order:
//!
//! 1. [`ChecksumStrategy`]: the key's hash against manifest item hashes
//! 2. [`UrlListStrategy`]: `dtool:` URLs git-annex recorded for the key
//!
//! Each strategy yields a list of [`Outcome`]s. The chain hands every found
//! candidate to an `accept` callback (a no-op when checking presence, the
//! copy when retrieving) and stops at the first one accepted. Everything
//! that went wrong on the way is collected as [`CandidateFailure`]s.

use crate::error::{CandidateFailure, RemoteResult};
use crate::key::ContentKey;
use crate::session::Session;
use crate::tracker::Tracker;
use crate::url::{dataset_prefix, RetrievalUrl};
use std::fmt::Debug;
use tracing::debug;

/// Name of [`ChecksumStrategy`]
pub const CHECKSUM_STRATEGY: &str = "checksum";

/// Name of [`UrlListStrategy`]
pub const URL_LIST_STRATEGY: &str = "url-list";

/// An item a strategy believes holds the key's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Strategy that produced the candidate
    pub strategy: &'static str,
    /// Item identifier
    pub item_id: String,
    /// Item relpath from the manifest
    pub relpath: String,
}

/// Result of trying one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The item exists in the manifest
    Found(Candidate),
    /// Definitely not there
    Miss,
    /// Could not tell
    Failed(CandidateFailure),
}

/// What a strategy did for one key
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Preconditions not met; the strategy does not count as attempted
    Skipped(String),
    /// Outcomes in manifest or URL-list order; empty means a clean miss
    Tried(Vec<Outcome>),
}

/// Everything a strategy may use
pub struct ResolutionContext<'a> {
    /// Session with the open dataset
    pub session: &'a mut Session,
    /// Requested key
    pub key: &'a ContentKey,
    /// git-annex query channel
    pub tracker: &'a mut dyn Tracker,
}

/// One way of locating a key in the dataset
pub trait ResolutionStrategy: Debug {
    /// Short name used in logs and failure lists
    fn name(&self) -> &'static str;

    /// Produce candidates for the context's key
    fn candidates(&self, ctx: &mut ResolutionContext<'_>) -> Attempt;
}

/// Matches the key's hash against manifest item hashes
///
/// Only attempted when the key's backend and the manifest's hash function
/// are of the same digest family.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChecksumStrategy;

impl ResolutionStrategy for ChecksumStrategy {
    fn name(&self) -> &'static str {
        CHECKSUM_STRATEGY
    }

    fn candidates(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        let Some(hash) = ctx.key.hash() else {
            return Attempt::Skipped(format!("key {} carries no hash", ctx.key));
        };
        let Some(family) = ctx.key.hash_family() else {
            return Attempt::Skipped(format!("{} is not a hashing backend", ctx.key.backend()));
        };

        let manifest = match ctx.session.manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                let failure = CandidateFailure::new(self.name(), hash, e);
                return Attempt::Tried(vec![Outcome::Failed(failure)]);
            }
        };

        if manifest.hash_family() != Some(family) {
            return Attempt::Skipped(format!(
                "manifest hashed with {}, key uses {}",
                manifest.hash_function,
                family.dtool_name()
            ));
        }

        debug!("Locating hash {} in dataset {}", hash, ctx.session.uri());
        Attempt::Tried(
            manifest
                .entries_with_hash(hash)
                .map(|entry| {
                    Outcome::Found(Candidate {
                        strategy: self.name(),
                        item_id: entry.identifier.to_string(),
                        relpath: entry.item.relpath.clone(),
                    })
                })
                .collect(),
        )
    }
}

/// Follows `dtool:` URLs git-annex recorded for the key
///
/// URLs of other datasets and malformed URLs are failures, not fatal; the
/// tracker may hold stale or foreign entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlListStrategy;

impl ResolutionStrategy for UrlListStrategy {
    fn name(&self) -> &'static str {
        URL_LIST_STRATEGY
    }

    fn candidates(&self, ctx: &mut ResolutionContext<'_>) -> Attempt {
        let uri = ctx.session.uri().to_string();
        let urls = match ctx.tracker.get_urls(ctx.key.as_str(), &dataset_prefix(&uri)) {
            Ok(urls) => urls,
            Err(e) => {
                return Attempt::Tried(vec![Outcome::Failed(CandidateFailure::new(
                    self.name(),
                    ctx.key.as_str(),
                    e,
                ))])
            }
        };
        if urls.is_empty() {
            return Attempt::Skipped(format!("no URLs recorded for {}", ctx.key));
        }
        debug!("Retrieve {} from {:?}", ctx.key, urls);

        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            let parsed = match RetrievalUrl::parse(&url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    outcomes.push(Outcome::Failed(CandidateFailure::new(self.name(), url, e)));
                    continue;
                }
            };
            if !parsed.belongs_to(&uri) {
                let reason = format!("belongs to dataset {}", parsed.dataset_uri);
                outcomes.push(Outcome::Failed(CandidateFailure::new(self.name(), url, reason)));
                continue;
            }

            match ctx.session.manifest() {
                Ok(manifest) => match manifest.get(&parsed.item_id) {
                    Some(item) => outcomes.push(Outcome::Found(Candidate {
                        strategy: self.name(),
                        item_id: parsed.item_id,
                        relpath: item.relpath.clone(),
                    })),
                    None => {
                        debug!("Item {} not in dataset {}", parsed.item_id, uri);
                        outcomes.push(Outcome::Miss);
                    }
                },
                Err(e) => outcomes.push(Outcome::Failed(CandidateFailure::new(self.name(), url, e))),
            }
        }
        Attempt::Tried(outcomes)
    }
}

/// The accepted candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    /// Strategy that found it
    pub strategy: &'static str,
    /// Item identifier
    pub item_id: String,
    /// Item relpath
    pub relpath: String,
}

/// Folded result of a chain run
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// First accepted candidate
    Found(ResolvedItem),
    /// Nothing accepted
    NotFound {
        /// Every failure, in the order encountered
        failures: Vec<CandidateFailure>,
        /// Number of strategies that were not skipped
        attempted: usize,
        /// At least one strategy was attempted and every attempted strategy
        /// produced only failures
        all_errored: bool,
    },
}

/// Strategies run in a fixed order
#[derive(Debug)]
pub struct ResolutionChain {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Default for ResolutionChain {
    fn default() -> Self {
        Self::new(vec![Box::new(ChecksumStrategy), Box::new(UrlListStrategy)])
    }
}

impl ResolutionChain {
    /// Creates a chain running `strategies` in order
    pub fn new(strategies: Vec<Box<dyn ResolutionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy names in run order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolves `key`, stopping at the first candidate `accept` takes
    ///
    /// A candidate `accept` rejects is recorded as a failure and the run
    /// continues with the next one. Later strategies are not consulted once a
    /// candidate is accepted.
    pub fn resolve(
        &self,
        session: &mut Session,
        key: &ContentKey,
        tracker: &mut dyn Tracker,
        accept: &mut dyn FnMut(&mut Session, &Candidate) -> RemoteResult<()>,
    ) -> Resolution {
        let mut failures = Vec::new();
        let mut attempted = 0;
        let mut errored = 0;

        for strategy in &self.strategies {
            let attempt = {
                let mut ctx = ResolutionContext {
                    session: &mut *session,
                    key,
                    tracker: &mut *tracker,
                };
                strategy.candidates(&mut ctx)
            };

            let outcomes = match attempt {
                Attempt::Skipped(reason) => {
                    debug!("Skipping {} strategy: {}", strategy.name(), reason);
                    continue;
                }
                Attempt::Tried(outcomes) => outcomes,
            };
            attempted += 1;

            let mut clean = outcomes.is_empty();
            for outcome in outcomes {
                match outcome {
                    Outcome::Found(candidate) => match accept(session, &candidate) {
                        Ok(()) => {
                            debug!(
                                "Located {} as item {} ({}) by {}",
                                key, candidate.item_id, candidate.relpath, candidate.strategy
                            );
                            tracker.debug(&format!(
                                "{} resolved to item {} ({})",
                                key, candidate.item_id, candidate.relpath
                            ));
                            return Resolution::Found(ResolvedItem {
                                strategy: candidate.strategy,
                                item_id: candidate.item_id,
                                relpath: candidate.relpath,
                            });
                        }
                        Err(e) => failures.push(CandidateFailure::new(
                            candidate.strategy,
                            candidate.item_id,
                            e,
                        )),
                    },
                    Outcome::Miss => clean = true,
                    Outcome::Failed(failure) => {
                        debug!("Candidate failed: {}", failure);
                        failures.push(failure);
                    }
                }
            }
            if !clean {
                errored += 1;
            }
        }

        Resolution::NotFound {
            failures,
            attempted,
            all_errored: attempted > 0 && errored == attempted,
        }
    }
}
