// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Thin wrapper around the `git` and `git annex` commands.
//!
//! Argument lists are built by free functions so they can be checked
//! without a git-annex installation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// `externaltype` under which the remote program is registered
pub const EXTERNAL_TYPE: &str = "dtool";

/// Special remote configuration log on the git-annex branch
pub const REMOTE_LOG: &str = "git-annex:remote.log";

/// `git annex initremote` arguments for a dtool remote
pub fn initremote_args(name: &str, uri: &str, claim_mode: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = [
        "annex",
        "initremote",
        name,
        "type=external",
        &format!("externaltype={}", EXTERNAL_TYPE),
        "encryption=none",
        "autoenable=true",
        &format!("uri={}", uri),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    if let Some(mode) = claim_mode {
        args.push(format!("claim-mode={}", mode));
    }
    args
}

/// `git annex enableremote` arguments
pub fn enableremote_args(name: &str) -> Vec<String> {
    vec!["annex".into(), "enableremote".into(), name.into()]
}

/// `git annex addurl` arguments registering `url` at `file`
pub fn addurl_args(file: &str, url: &str, fast: bool) -> Vec<String> {
    let mut args = vec!["annex".to_string(), "addurl".to_string()];
    if fast {
        args.push("--fast".to_string());
    }
    args.push(format!("--file={}", file));
    args.push(url.to_string());
    args
}

/// `git commit` arguments limited to `paths`
pub fn commit_args(message: &str, paths: &[String]) -> Vec<String> {
    let mut args: Vec<String> = vec!["commit".into(), "-m".into(), message.into(), "--".into()];
    args.extend(paths.iter().cloned());
    args
}

/// `git diff` arguments that exit 1 when `paths` have staged changes
pub fn staged_diff_args(paths: &[String]) -> Vec<String> {
    let mut args: Vec<String> = ["diff", "--cached", "--quiet", "--"].map(String::from).to_vec();
    args.extend(paths.iter().cloned());
    args
}

/// Value of `setting` for the special remote called `name` in a remote.log
///
/// Each line is `<uuid> key=value ... timestamp=<secs>s`; when several lines
/// name the remote, the newest wins.
pub fn remote_log_setting(log: &str, name: &str, setting: &str) -> Option<String> {
    let name_field = format!("name={}", name);
    log.lines()
        .filter(|line| line.split_whitespace().skip(1).any(|f| f == name_field))
        .map(|line| {
            let fields: Vec<(&str, &str)> = line
                .split_whitespace()
                .skip(1)
                .filter_map(|f| f.split_once('='))
                .collect();
            let timestamp = fields
                .iter()
                .find(|(k, _)| *k == "timestamp")
                .and_then(|(_, v)| v.trim_end_matches('s').parse::<f64>().ok())
                .unwrap_or(0.0);
            let value = fields
                .iter()
                .find(|(k, _)| *k == setting)
                .map(|(_, v)| v.to_string());
            (timestamp, value)
        })
        .fold(None, |newest: Option<(f64, Option<String>)>, entry| match newest {
            Some(current) if current.0 > entry.0 => Some(current),
            _ => Some(entry),
        })
        .and_then(|(_, value)| value)
}

/// Renders arguments the way a shell user would type them
pub fn display_command(args: &[String]) -> String {
    let quoted: Vec<String> = args
        .iter()
        .map(|arg| {
            if arg.contains(char::is_whitespace) {
                format!("'{}'", arg)
            } else {
                arg.clone()
            }
        })
        .collect();
    format!("git {}", quoted.join(" "))
}

/// A git-annex repository on disk
#[derive(Debug, Clone)]
pub struct AnnexRepo {
    path: PathBuf,
}

impl AnnexRepo {
    /// Opens the repository at `path`
    ///
    /// # Errors
    ///
    /// Fails if `path` has no `.git` entry.
    pub fn open(path: &Path) -> Result<Self> {
        let path = dunce::canonicalize(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        if !path.join(".git").exists() {
            anyhow::bail!(
                "Not a git repository: {}\nRun 'git init' and 'git annex init' first",
                path.display()
            );
        }
        Ok(Self { path })
    }

    /// Repository root
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `git` with `args` in the repository, returning stdout
    pub fn git(&self, args: &[String]) -> Result<String> {
        debug!("Running: {}", display_command(args));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .with_context(|| format!("Failed to run: {}", display_command(args)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("{} failed: {}", display_command(args), error.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `paths` have changes staged for commit
    pub fn has_staged_changes(&self, paths: &[String]) -> Result<bool> {
        let args = staged_diff_args(paths);
        debug!("Running: {}", display_command(&args));
        let status = Command::new("git")
            .args(&args)
            .current_dir(&self.path)
            .status()
            .with_context(|| format!("Failed to run: {}", display_command(&args)))?;
        match status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => anyhow::bail!("{} failed: {}", display_command(&args), status),
        }
    }

    /// Setting stored on the git-annex branch for the special remote `name`
    pub fn stored_remote_setting(&self, name: &str, setting: &str) -> Option<String> {
        let log = self.git(&["show".to_string(), REMOTE_LOG.to_string()]).ok()?;
        remote_log_setting(&log, name, setting)
    }

    /// Whether a dtool remote called `name` is enabled in this clone
    pub fn remote_enabled(&self, name: &str) -> bool {
        let key = format!("remote.{}.annex-externaltype", name);
        self.git(&["config".to_string(), "--get".to_string(), key])
            .map(|value| value.trim() == EXTERNAL_TYPE)
            .unwrap_or(false)
    }

    /// Whether the git-annex branch knows a special remote called `name`
    pub fn remote_known(&self, name: &str) -> bool {
        let args = ["annex", "info", "--fast", name].map(String::from);
        self.git(&args).is_ok()
    }
}
