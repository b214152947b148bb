// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! CLI command helpers for testing the dtool-annex binaries.

use assert_cmd::Command;

/// Creates a `dtool-annex` Command for testing.
///
/// # Example
/// ```ignore
/// use dtool_annex_test_utils::dtool_annex;
///
/// dtool_annex()
///     .arg("ls")
///     .arg(dataset.uri())
///     .assert()
///     .success();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn dtool_annex() -> Command {
    Command::cargo_bin("dtool-annex").expect("dtool-annex binary not found")
}

/// Creates a `git-annex-remote-dtool` Command for testing.
///
/// Logging is silenced so stderr assertions only see what the test asks for.
#[allow(deprecated)]
pub fn git_annex_remote_dtool() -> Command {
    let mut cmd =
        Command::cargo_bin("git-annex-remote-dtool").expect("git-annex-remote-dtool binary not found");
    cmd.env("DTOOL_ANNEX_LOG", "off");
    cmd
}
