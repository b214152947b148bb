// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! Colored status lines for the `dtool-annex` commands.
//!
//! Status goes to stderr so that listings on stdout stay pipeable.

use console::style;

/// Print a success message with a green check mark
pub fn success(msg: &str) {
    eprintln!("{} {}", style("✔").green().bold(), msg);
}

/// Print an error message with a red cross
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✘").red().bold(), msg);
}

/// Print an informational message
pub fn info(msg: &str) {
    eprintln!("{} {}", style("ℹ").cyan(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow(), msg);
}

/// Print a key-value detail line, value highlighted
pub fn detail(key: &str, value: &str) {
    eprintln!("  {}: {}", key, style(value).cyan());
}

/// Print a section header
pub fn header(msg: &str) {
    eprintln!("{}", style(msg).bold());
}
