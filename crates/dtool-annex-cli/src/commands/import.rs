// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Register every dataset item as an annexed file backed by its dtool: URL

use super::init_remote::{plan_remote, RemoteAction};
use super::ls::{listed_items, ListedItem};
use super::open_for_reading;
use crate::annex::{addurl_args, commit_args, display_command, AnnexRepo};
use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct ImportCmd {
    /// Dataset URI or path, exactly as the remote is configured with
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Name of the dtool special remote, created or enabled when missing
    #[arg(short, long, value_name = "NAME", default_value = "dtool")]
    pub remote: String,

    /// Directory inside the repository to place items under
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<String>,

    /// Record URLs without downloading content
    #[arg(long)]
    pub fast: bool,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Do not commit after adding
    #[arg(long)]
    pub no_save: bool,

    /// Repository path (defaults to current directory)
    #[arg(short = 'C', long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Print the git-annex commands instead of running them
    #[arg(long)]
    pub dry_run: bool,
}

/// Repository path for an item, `prefix` joined with `/`
pub fn target_path(prefix: Option<&str>, relpath: &str) -> String {
    match prefix.map(|p| p.trim_end_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, relpath),
        None => relpath.to_string(),
    }
}

impl ImportCmd {
    fn default_message(&self, name: &str) -> String {
        format!("Import dtool dataset {} ({})", name, self.uri)
    }

    fn targets(&self, items: &[ListedItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| target_path(self.prefix.as_deref(), &item.relpath))
            .collect()
    }

    /// Remote setup followed by one `addurl` per item
    fn commands(&self, action: &RemoteAction, items: &[ListedItem]) -> Vec<Vec<String>> {
        action
            .args(&self.remote, &self.uri, None)
            .into_iter()
            .chain(
                items
                    .iter()
                    .zip(self.targets(items))
                    .map(|(item, target)| addurl_args(&target, &item.url, self.fast)),
            )
            .collect()
    }

    /// Commit of the added paths only, unless saving is disabled
    fn commit(&self, items: &[ListedItem], name: &str) -> Option<Vec<String>> {
        if self.no_save || items.is_empty() {
            return None;
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| self.default_message(name));
        Some(commit_args(&message, &self.targets(items)))
    }

    pub fn execute(self) -> Result<()> {
        let repo_path = match self.repo.clone() {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        let repo = AnnexRepo::open(&repo_path)?;
        let (handle, manifest) = open_for_reading(&self.uri)?;
        let items = listed_items(&self.uri, &manifest);
        if items.is_empty() {
            output::warning(&format!("Dataset {} has no items", self.uri));
            return Ok(());
        }

        let action = plan_remote(&repo, &self.remote, &self.uri);
        let commands = self.commands(&action, &items);
        let commit = self.commit(&items, handle.name());
        if self.dry_run {
            for args in commands.iter().chain(commit.iter()) {
                println!("{}", display_command(args));
            }
            return Ok(());
        }

        output::info(&format!(
            "Importing {} items from {} into {}",
            items.len(),
            handle.name(),
            repo.path().display()
        ));
        for args in &commands {
            if let Err(e) = repo.git(args) {
                warn!("{:#}", e);
                return Err(e);
            }
        }
        if let Some(args) = commit {
            if repo.has_staged_changes(&self.targets(&items))? {
                repo.git(&args)?;
            } else {
                output::info("Nothing new to commit");
            }
        }
        info!("Imported {} items from {}", items.len(), self.uri);
        output::success(&format!("Imported {} items", items.len()));
        Ok(())
    }
}
