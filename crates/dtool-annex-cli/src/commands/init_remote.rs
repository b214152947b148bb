// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Register the dtool special remote with a git-annex repository

use crate::annex::{display_command, enableremote_args, initremote_args, AnnexRepo};
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use dtool_annex_remote::config::URI_SETTING;
use dtool_annex_remote::ClaimMode;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What registering a remote will do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAction {
    /// Remote is already enabled in this clone
    AlreadyEnabled,
    /// Remote is known to git-annex but not enabled here
    Enable,
    /// Remote does not exist yet
    Initialize,
}

impl RemoteAction {
    /// Picks the action from what the repository reports
    pub fn decide(enabled: bool, known: bool) -> Self {
        match (enabled, known) {
            (true, _) => RemoteAction::AlreadyEnabled,
            (false, true) => RemoteAction::Enable,
            (false, false) => RemoteAction::Initialize,
        }
    }

    /// git arguments carrying out the action, `None` when nothing is needed
    pub fn args(&self, name: &str, uri: &str, claim_mode: Option<ClaimMode>) -> Option<Vec<String>> {
        match self {
            RemoteAction::AlreadyEnabled => None,
            RemoteAction::Enable => Some(enableremote_args(name)),
            RemoteAction::Initialize => Some(initremote_args(
                name,
                uri,
                claim_mode.map(|mode| mode.as_str()),
            )),
        }
    }
}

/// Warning for a remote whose stored dataset differs from the requested one
pub fn uri_mismatch(name: &str, stored: &str, requested: &str) -> Option<String> {
    (stored != requested).then(|| {
        format!(
            "Special remote '{}' is configured for {}, not {}; keeping the stored dataset",
            name, stored, requested
        )
    })
}

/// Works out how to bring up the remote `name` for `uri` in `repo`
///
/// An existing remote keeps its stored `uri`; a differing request is reported
/// as a warning.
pub fn plan_remote(repo: &AnnexRepo, name: &str, uri: &str) -> RemoteAction {
    let action = RemoteAction::decide(repo.remote_enabled(name), repo.remote_known(name));
    debug!("Remote {}: {:?}", name, action);
    if action != RemoteAction::Initialize {
        let mismatch = repo
            .stored_remote_setting(name, URI_SETTING)
            .and_then(|stored| uri_mismatch(name, &stored, uri));
        if let Some(message) = mismatch {
            warn!("{}", message);
            output::warning(&message);
        }
    }
    action
}

#[derive(Debug, Args)]
pub struct InitRemoteCmd {
    /// Dataset URI or path
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Name of the special remote
    #[arg(short, long, default_value = "dtool")]
    pub name: String,

    /// Which dtool: URLs the remote claims (dataset or scheme)
    #[arg(long, value_name = "MODE")]
    pub claim_mode: Option<ClaimMode>,

    /// Repository path (defaults to current directory)
    #[arg(short = 'C', long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Print the git-annex command instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

impl InitRemoteCmd {
    pub fn execute(self) -> Result<()> {
        let repo_path = match self.repo.clone() {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let repo = AnnexRepo::open(&repo_path)?;
        let action = plan_remote(&repo, &self.name, &self.uri);
        let Some(args) = action.args(&self.name, &self.uri, self.claim_mode) else {
            output::info(&format!("Special remote '{}' is already enabled", self.name));
            return Ok(());
        };

        if self.dry_run {
            println!("{}", display_command(&args));
            return Ok(());
        }

        repo.git(&args)?;
        output::success(&format!("Special remote '{}' ready", self.name));
        output::detail("Dataset", &self.uri);
        output::detail("Repository", &repo.path().display().to_string());
        Ok(())
    }
}
