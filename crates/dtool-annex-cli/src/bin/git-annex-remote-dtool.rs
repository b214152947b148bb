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

//! External special remote program started by git-annex.
//!
//! git-annex finds it on `PATH` by name (`externaltype=dtool`) and talks
//! to it over stdin/stdout. Logs go to stderr.

use dtool_annex_dataset::DiskLibrary;
use dtool_annex_observability::init_from_env;
use dtool_annex_remote::{serve, DtoolRemote};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};

fn main() -> ExitCode {
    if let Err(e) = init_from_env("warn") {
        eprintln!("git-annex-remote-dtool: {}", e);
    }
    debug!("Starting git-annex-remote-dtool {}", env!("CARGO_PKG_VERSION"));

    let mut remote = DtoolRemote::new(Arc::new(DiskLibrary::new()));
    let stdin = io::stdin();
    match serve(&mut remote, stdin.lock(), io::stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
