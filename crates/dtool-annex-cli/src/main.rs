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

mod annex;
mod commands;
mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use dtool_annex_observability::{init_tracing_with_config, LogConfig};
use std::io;

#[derive(Parser)]
#[command(name = "dtool-annex")]
#[command(version, about = "Use dtool datasets as git-annex special remotes")]
#[command(
    long_about = "dtool-annex registers dtool datasets with git-annex repositories.
Content is served by the git-annex-remote-dtool special remote program."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List dataset items and their dtool: URLs
    Ls(LsCmd),

    /// Create or enable the dtool special remote in a repository
    #[command(name = "init-remote")]
    InitRemote(InitRemoteCmd),

    /// Add every dataset item to the repository by URL
    Import(ImportCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let forced_color = match cli.color.as_str() {
        "never" => Some(false),
        "always" => Some(true),
        "auto" => None,
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            std::process::exit(2);
        }
    };
    if let Some(enabled) = forced_color {
        console::set_colors_enabled_stderr(enabled);
    }

    if !cli.quiet {
        let default_level = if cli.verbose { "debug" } else { "info" };
        match LogConfig::from_env(default_level) {
            Ok(mut config) => {
                if cli.verbose {
                    config = config.with_level("debug");
                }
                if let Some(enabled) = forced_color {
                    config = config.with_color(enabled);
                }
                init_tracing_with_config(&config).ok();
            }
            Err(e) => output::warning(&format!("Ignoring logging configuration: {}", e)),
        }
    }

    let result = match cli.command {
        Commands::Ls(cmd) => cmd.execute(),
        Commands::InitRemote(cmd) => cmd.execute(),
        Commands::Import(cmd) => cmd.execute(),
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn print_version() {
    println!("dtool-annex {}", env!("CARGO_PKG_VERSION"));
    println!("git-annex remote protocol: {}", dtool_annex_remote::PROTOCOL_VERSION);
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "dtool-annex", &mut io::stdout());
}
