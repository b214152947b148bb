// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2025 dtool-annex Contributors

//! git-annex external special remote protocol
//!
//! Line based, one message per line, fields separated by single spaces; the
//! last field of a message may itself contain spaces. The remote speaks
//! first:
//!
//! ```text
//! remote:    VERSION 1
//! git-annex: INITREMOTE
//! remote:    GETCONFIG uri
//! git-annex: VALUE file:///data/my-dataset
//! remote:    INITREMOTE-SUCCESS
//! git-annex: PREPARE
//! ...
//! git-annex: CHECKPRESENT MD5E-s0--d41d8cd98f00b204e9800998ecf8427e.txt
//! remote:    GETURLS MD5E-s0--d41d8cd98f00b204e9800998ecf8427e.txt dtool:file:///data/my-dataset
//! git-annex: VALUE
//! remote:    CHECKPRESENT-SUCCESS MD5E-s0--d41d8cd98f00b204e9800998ecf8427e.txt
//! ```
//!
//! While handling a request the remote may send `GETCONFIG`, `GETURLS` and
//! `DEBUG`; [`AnnexChannel`] implements [`Tracker`] on top of that.

use crate::config::SETTINGS;
use crate::error::{RemoteError, RemoteResult};
use crate::responder::{Availability, DtoolRemote};
use crate::tracker::Tracker;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, error, trace, warn};

/// Protocol version announced on start
pub const PROTOCOL_VERSION: u32 = 1;

/// Protocol extensions this remote understands
pub const EXTENSIONS: &[&str] = &["INFO"];

/// Direction of a `TRANSFER` or `TRANSFEREXPORT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// git-annex sends content to the remote
    Store,
    /// git-annex fetches content from the remote
    Retrieve,
}

impl Direction {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "STORE" => Some(Direction::Store),
            "RETRIEVE" => Some(Direction::Retrieve),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Store => f.write_str("STORE"),
            Direction::Retrieve => f.write_str("RETRIEVE"),
        }
    }
}

/// A request from git-annex
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `EXTENSIONS ...`
    Extensions(Vec<String>),
    /// `INITREMOTE`
    InitRemote,
    /// `LISTCONFIGS`
    ListConfigs,
    /// `PREPARE`
    Prepare,
    /// `GETCOST`
    GetCost,
    /// `GETAVAILABILITY`
    GetAvailability,
    /// `CLAIMURL url`
    ClaimUrl(String),
    /// `CHECKURL url`
    CheckUrl(String),
    /// `CHECKPRESENT key`
    CheckPresent(String),
    /// `TRANSFER STORE|RETRIEVE key file`
    Transfer {
        /// Direction
        direction: Direction,
        /// Content key
        key: String,
        /// Local file
        file: String,
    },
    /// `REMOVE key`
    Remove(String),
    /// `WHEREIS key`
    WhereIs(String),
    /// `GETINFO`
    GetInfo,
    /// `EXPORTSUPPORTED`
    ExportSupported,
    /// `EXPORT name`, announcing the path of the next export request
    Export(String),
    /// `TRANSFEREXPORT STORE|RETRIEVE key file`
    TransferExport {
        /// Direction
        direction: Direction,
        /// Content key
        key: String,
        /// Local file
        file: String,
    },
    /// `CHECKPRESENTEXPORT key`
    CheckPresentExport(String),
    /// `REMOVEEXPORT key`
    RemoveExport(String),
    /// `REMOVEEXPORTDIRECTORY dir`
    RemoveExportDirectory(String),
    /// `RENAMEEXPORT key new-name`
    RenameExport {
        /// Content key
        key: String,
        /// New export path
        new_name: String,
    },
    /// `ERROR message`
    Error(String),
    /// Anything not understood, including malformed known requests
    Unknown(String),
}

impl Request {
    /// Parses one line; never fails
    pub fn parse(line: &str) -> Self {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let unknown = || Request::Unknown(line.to_string());
        let single = |f: fn(String) -> Request| {
            if rest.is_empty() {
                unknown()
            } else {
                f(rest.to_string())
            }
        };

        match command {
            "EXTENSIONS" => {
                Request::Extensions(rest.split_whitespace().map(str::to_string).collect())
            }
            "INITREMOTE" => Request::InitRemote,
            "LISTCONFIGS" => Request::ListConfigs,
            "PREPARE" => Request::Prepare,
            "GETCOST" => Request::GetCost,
            "GETAVAILABILITY" => Request::GetAvailability,
            "GETINFO" => Request::GetInfo,
            "EXPORTSUPPORTED" => Request::ExportSupported,
            "CLAIMURL" => single(Request::ClaimUrl),
            "CHECKURL" => single(Request::CheckUrl),
            "CHECKPRESENT" => single(Request::CheckPresent),
            "REMOVE" => single(Request::Remove),
            "WHEREIS" => single(Request::WhereIs),
            "EXPORT" => single(Request::Export),
            "CHECKPRESENTEXPORT" => single(Request::CheckPresentExport),
            "REMOVEEXPORT" => single(Request::RemoveExport),
            "REMOVEEXPORTDIRECTORY" => single(Request::RemoveExportDirectory),
            "ERROR" => Request::Error(rest.to_string()),
            "TRANSFER" | "TRANSFEREXPORT" => {
                let mut fields = rest.splitn(3, ' ');
                let (Some(direction), Some(key), Some(file)) = (
                    fields.next().and_then(Direction::parse),
                    fields.next().filter(|k| !k.is_empty()),
                    fields.next().filter(|f| !f.is_empty()),
                ) else {
                    return unknown();
                };
                let (key, file) = (key.to_string(), file.to_string());
                if command == "TRANSFER" {
                    Request::Transfer { direction, key, file }
                } else {
                    Request::TransferExport { direction, key, file }
                }
            }
            "RENAMEEXPORT" => match rest.split_once(' ') {
                Some((key, new_name)) if !key.is_empty() && !new_name.is_empty() => {
                    Request::RenameExport {
                        key: key.to_string(),
                        new_name: new_name.to_string(),
                    }
                }
                _ => unknown(),
            },
            _ => unknown(),
        }
    }
}

/// A reply to git-annex
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `VERSION n`
    Version(u32),
    /// `EXTENSIONS ...`
    Extensions(Vec<String>),
    /// `INITREMOTE-SUCCESS`
    InitRemoteSuccess,
    /// `INITREMOTE-FAILURE msg`
    InitRemoteFailure(String),
    /// `PREPARE-SUCCESS`
    PrepareSuccess,
    /// `PREPARE-FAILURE msg`
    PrepareFailure(String),
    /// `COST n`
    Cost(u32),
    /// `AVAILABILITY GLOBAL|LOCAL`
    Availability(Availability),
    /// `CLAIMURL-SUCCESS`
    ClaimUrlSuccess,
    /// `CLAIMURL-FAILURE`
    ClaimUrlFailure,
    /// `CHECKURL-CONTENTS size|UNKNOWN [name]`
    CheckUrlContents {
        /// Size, if known
        size: Option<u64>,
        /// Suggested file name
        name: Option<String>,
    },
    /// `CHECKURL-FAILURE msg`
    CheckUrlFailure(String),
    /// `CHECKPRESENT-SUCCESS key`
    CheckPresentSuccess(String),
    /// `CHECKPRESENT-FAILURE key`
    CheckPresentFailure(String),
    /// `CHECKPRESENT-UNKNOWN key msg`
    CheckPresentUnknown {
        /// Content key
        key: String,
        /// Why presence is unknown
        message: String,
    },
    /// `TRANSFER-SUCCESS dir key`
    TransferSuccess {
        /// Direction
        direction: Direction,
        /// Content key
        key: String,
    },
    /// `TRANSFER-FAILURE dir key msg`
    TransferFailure {
        /// Direction
        direction: Direction,
        /// Content key
        key: String,
        /// Why the transfer failed
        message: String,
    },
    /// `REMOVE-SUCCESS key`
    RemoveSuccess(String),
    /// `REMOVE-FAILURE key msg`
    RemoveFailure {
        /// Content key
        key: String,
        /// Why removal failed
        message: String,
    },
    /// `WHEREIS-SUCCESS location`
    WhereIsSuccess(String),
    /// `WHEREIS-FAILURE`
    WhereIsFailure,
    /// `INFOFIELD name`
    InfoField(String),
    /// `INFOVALUE value`
    InfoValue(String),
    /// `INFOEND`
    InfoEnd,
    /// `CONFIG name description`
    Config {
        /// Setting name
        name: String,
        /// Setting description
        description: String,
    },
    /// `CONFIGEND`
    ConfigEnd,
    /// `EXPORTSUPPORTED-SUCCESS`
    ExportSupportedSuccess,
    /// `REMOVEEXPORTDIRECTORY-SUCCESS`
    RemoveExportDirectorySuccess,
    /// `REMOVEEXPORTDIRECTORY-FAILURE`
    RemoveExportDirectoryFailure,
    /// `RENAMEEXPORT-SUCCESS key`
    RenameExportSuccess(String),
    /// `RENAMEEXPORT-FAILURE key`
    RenameExportFailure(String),
    /// `UNSUPPORTED-REQUEST`
    UnsupportedRequest,
    /// `ERROR msg`
    Error(String),
}

/// Flattens a message onto one protocol line
pub fn one_line(message: &str) -> String {
    message
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Version(version) => write!(f, "VERSION {}", version),
            Reply::Extensions(extensions) => write!(f, "EXTENSIONS {}", extensions.join(" ")),
            Reply::InitRemoteSuccess => f.write_str("INITREMOTE-SUCCESS"),
            Reply::InitRemoteFailure(msg) => write!(f, "INITREMOTE-FAILURE {}", one_line(msg)),
            Reply::PrepareSuccess => f.write_str("PREPARE-SUCCESS"),
            Reply::PrepareFailure(msg) => write!(f, "PREPARE-FAILURE {}", one_line(msg)),
            Reply::Cost(cost) => write!(f, "COST {}", cost),
            Reply::Availability(availability) => write!(f, "AVAILABILITY {}", availability),
            Reply::ClaimUrlSuccess => f.write_str("CLAIMURL-SUCCESS"),
            Reply::ClaimUrlFailure => f.write_str("CLAIMURL-FAILURE"),
            Reply::CheckUrlContents { size, name } => {
                f.write_str("CHECKURL-CONTENTS ")?;
                match size {
                    Some(size) => write!(f, "{}", size)?,
                    None => f.write_str("UNKNOWN")?,
                }
                if let Some(name) = name {
                    write!(f, " {}", one_line(name))?;
                }
                Ok(())
            }
            Reply::CheckUrlFailure(msg) => write!(f, "CHECKURL-FAILURE {}", one_line(msg)),
            Reply::CheckPresentSuccess(key) => write!(f, "CHECKPRESENT-SUCCESS {}", key),
            Reply::CheckPresentFailure(key) => write!(f, "CHECKPRESENT-FAILURE {}", key),
            Reply::CheckPresentUnknown { key, message } => {
                write!(f, "CHECKPRESENT-UNKNOWN {} {}", key, one_line(message))
            }
            Reply::TransferSuccess { direction, key } => {
                write!(f, "TRANSFER-SUCCESS {} {}", direction, key)
            }
            Reply::TransferFailure {
                direction,
                key,
                message,
            } => write!(f, "TRANSFER-FAILURE {} {} {}", direction, key, one_line(message)),
            Reply::RemoveSuccess(key) => write!(f, "REMOVE-SUCCESS {}", key),
            Reply::RemoveFailure { key, message } => {
                write!(f, "REMOVE-FAILURE {} {}", key, one_line(message))
            }
            Reply::WhereIsSuccess(location) => write!(f, "WHEREIS-SUCCESS {}", one_line(location)),
            Reply::WhereIsFailure => f.write_str("WHEREIS-FAILURE"),
            Reply::InfoField(name) => write!(f, "INFOFIELD {}", one_line(name)),
            Reply::InfoValue(value) => write!(f, "INFOVALUE {}", one_line(value)),
            Reply::InfoEnd => f.write_str("INFOEND"),
            Reply::Config { name, description } => {
                write!(f, "CONFIG {} {}", name, one_line(description))
            }
            Reply::ConfigEnd => f.write_str("CONFIGEND"),
            Reply::ExportSupportedSuccess => f.write_str("EXPORTSUPPORTED-SUCCESS"),
            Reply::RemoveExportDirectorySuccess => f.write_str("REMOVEEXPORTDIRECTORY-SUCCESS"),
            Reply::RemoveExportDirectoryFailure => f.write_str("REMOVEEXPORTDIRECTORY-FAILURE"),
            Reply::RenameExportSuccess(key) => write!(f, "RENAMEEXPORT-SUCCESS {}", key),
            Reply::RenameExportFailure(key) => write!(f, "RENAMEEXPORT-FAILURE {}", key),
            Reply::UnsupportedRequest => f.write_str("UNSUPPORTED-REQUEST"),
            Reply::Error(msg) => write!(f, "ERROR {}", one_line(msg)),
        }
    }
}

/// Both directions of the pipe to git-annex
pub struct AnnexChannel<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> AnnexChannel<R, W> {
    /// Wraps a reader and writer
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the channel, returning the writer
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &str) -> RemoteResult<()> {
        trace!("-> {}", line);
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Sends a reply
    pub fn send(&mut self, reply: &Reply) -> RemoteResult<()> {
        self.write_line(&reply.to_string())
    }

    /// Reads the next line without its line ending, `None` at EOF
    pub fn read_line(&mut self) -> RemoteResult<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!("<- {}", line);
        Ok(Some(line))
    }

    fn read_value(&mut self) -> RemoteResult<String> {
        let line = self
            .read_line()?
            .ok_or_else(|| RemoteError::Tracker("git-annex closed the connection".to_string()))?;
        match line.strip_prefix("VALUE") {
            Some(value) if value.is_empty() || value.starts_with(' ') => {
                Ok(value.strip_prefix(' ').unwrap_or(value).to_string())
            }
            _ => Err(RemoteError::Tracker(format!("expected VALUE, got '{}'", line))),
        }
    }
}

impl<R: BufRead, W: Write> Tracker for AnnexChannel<R, W> {
    fn get_config(&mut self, name: &str) -> RemoteResult<Option<String>> {
        self.write_line(&format!("GETCONFIG {}", name))?;
        let value = self.read_value()?;
        Ok(Some(value).filter(|v| !v.is_empty()))
    }

    fn get_urls(&mut self, key: &str, prefix: &str) -> RemoteResult<Vec<String>> {
        self.write_line(&format!("GETURLS {} {}", key, prefix))?;
        let mut urls = Vec::new();
        loop {
            let value = self.read_value()?;
            if value.is_empty() {
                return Ok(urls);
            }
            urls.push(value);
        }
    }

    fn debug(&mut self, message: &str) {
        if let Err(e) = self.write_line(&format!("DEBUG {}", one_line(message))) {
            warn!("Failed to send DEBUG: {}", e);
        }
    }
}

/// Drives a [`DtoolRemote`] from git-annex requests until EOF
pub struct ProtocolServer<'a, R, W> {
    remote: &'a mut DtoolRemote,
    channel: AnnexChannel<R, W>,
    export_name: Option<String>,
}

impl<'a, R: BufRead, W: Write> ProtocolServer<'a, R, W> {
    /// Creates a server over `reader` and `writer`
    pub fn new(remote: &'a mut DtoolRemote, reader: R, writer: W) -> Self {
        Self {
            remote,
            channel: AnnexChannel::new(reader, writer),
            export_name: None,
        }
    }

    /// Announces the protocol version and answers requests until EOF
    ///
    /// # Errors
    ///
    /// I/O errors on the pipe, or `RemoteError::Protocol` when git-annex
    /// sends `ERROR`.
    pub fn run(mut self) -> RemoteResult<()> {
        self.channel.send(&Reply::Version(PROTOCOL_VERSION))?;
        while let Some(line) = self.channel.read_line()? {
            if line.is_empty() {
                continue;
            }
            let request = Request::parse(&line);
            debug!("Request: {:?}", request);
            self.handle(request)?;
        }
        debug!("git-annex closed the connection");
        Ok(())
    }

    fn handle(&mut self, request: Request) -> RemoteResult<()> {
        let remote = &mut *self.remote;
        let channel = &mut self.channel;

        match request {
            Request::Extensions(offered) => {
                debug!("git-annex offers extensions {:?}", offered);
                channel.send(&Reply::Extensions(
                    EXTENSIONS.iter().map(|e| e.to_string()).collect(),
                ))
            }
            Request::InitRemote => {
                let reply = match remote.initialize(channel) {
                    Ok(()) => Reply::InitRemoteSuccess,
                    Err(e) => Reply::InitRemoteFailure(e.to_string()),
                };
                channel.send(&reply)
            }
            Request::ListConfigs => {
                for (name, description) in SETTINGS {
                    channel.send(&Reply::Config {
                        name: name.to_string(),
                        description: description.to_string(),
                    })?;
                }
                channel.send(&Reply::ConfigEnd)
            }
            Request::Prepare => {
                let reply = match remote.prepare(channel) {
                    Ok(()) => Reply::PrepareSuccess,
                    Err(e) => {
                        error!("{}", e);
                        Reply::PrepareFailure(e.to_string())
                    }
                };
                channel.send(&reply)
            }
            Request::GetCost => channel.send(&Reply::Cost(remote.get_cost())),
            Request::GetAvailability => {
                channel.send(&Reply::Availability(remote.get_availability()))
            }
            Request::ClaimUrl(url) => {
                let reply = if remote.claim_url(&url) {
                    Reply::ClaimUrlSuccess
                } else {
                    Reply::ClaimUrlFailure
                };
                channel.send(&reply)
            }
            Request::CheckUrl(url) => {
                let reply = if remote.check_url(&url) {
                    let contents = remote.describe_url(&url).unwrap_or_default();
                    Reply::CheckUrlContents {
                        size: contents.size,
                        name: contents.name,
                    }
                } else {
                    Reply::CheckUrlFailure(format!("{} is not a URL of this dtool dataset", url))
                };
                channel.send(&reply)
            }
            Request::CheckPresent(key) => {
                let reply = match remote.check_present(&key, channel) {
                    Ok(true) => Reply::CheckPresentSuccess(key),
                    Ok(false) => Reply::CheckPresentFailure(key),
                    Err(e) => {
                        warn!("{}", e);
                        Reply::CheckPresentUnknown {
                            key,
                            message: e.to_string(),
                        }
                    }
                };
                channel.send(&reply)
            }
            Request::Transfer {
                direction,
                key,
                file,
            } => {
                let result = match direction {
                    Direction::Retrieve => remote.transfer_retrieve(&key, Path::new(&file), channel),
                    Direction::Store => remote.transfer_store(&key, Path::new(&file)),
                };
                channel.send(&transfer_reply(direction, key, result))
            }
            Request::Remove(key) => {
                let result = remote.remove(&key);
                channel.send(&remove_reply(key, result))
            }
            Request::WhereIs(key) => {
                let reply = match remote.whereis(&key, channel) {
                    Ok(Some(relpath)) => Reply::WhereIsSuccess(relpath),
                    Ok(None) => Reply::WhereIsFailure,
                    Err(e) => {
                        debug!("WHEREIS {}: {}", key, e);
                        Reply::WhereIsFailure
                    }
                };
                channel.send(&reply)
            }
            Request::GetInfo => {
                for (field, value) in remote.info() {
                    channel.send(&Reply::InfoField(field))?;
                    channel.send(&Reply::InfoValue(value))?;
                }
                channel.send(&Reply::InfoEnd)
            }
            Request::ExportSupported => channel.send(&Reply::ExportSupportedSuccess),
            Request::Export(name) => {
                self.export_name = Some(name);
                Ok(())
            }
            Request::TransferExport {
                direction,
                key,
                file,
            } => {
                let result = match (self.export_name.take(), direction) {
                    (None, _) => Err(RemoteError::Protocol(
                        "TRANSFEREXPORT without preceding EXPORT".to_string(),
                    )),
                    (Some(name), Direction::Retrieve) => {
                        remote.transfer_export_retrieve(&key, Path::new(&file), &name)
                    }
                    (Some(name), Direction::Store) => {
                        remote.transfer_export_store(&key, Path::new(&file), &name)
                    }
                };
                channel.send(&transfer_reply(direction, key, result))
            }
            Request::CheckPresentExport(key) => {
                let name = self.export_name.take().unwrap_or_default();
                let reply = match remote.check_present_export(&key, &name) {
                    Ok(true) => Reply::CheckPresentSuccess(key),
                    Ok(false) => Reply::CheckPresentFailure(key),
                    Err(e) => Reply::CheckPresentUnknown {
                        key,
                        message: e.to_string(),
                    },
                };
                channel.send(&reply)
            }
            Request::RemoveExport(key) => {
                let name = self.export_name.take().unwrap_or_default();
                let result = remote.remove_export(&key, &name);
                channel.send(&remove_reply(key, result))
            }
            Request::RemoveExportDirectory(dir) => {
                let reply = match remote.remove_export_directory(&dir) {
                    Ok(()) => Reply::RemoveExportDirectorySuccess,
                    Err(e) => {
                        debug!("{}", e);
                        Reply::RemoveExportDirectoryFailure
                    }
                };
                channel.send(&reply)
            }
            Request::RenameExport { key, new_name } => {
                let from = self.export_name.take().unwrap_or_default();
                let reply = match remote.rename_export(&key, &from, &new_name) {
                    Ok(()) => Reply::RenameExportSuccess(key),
                    Err(e) => {
                        debug!("{}", e);
                        Reply::RenameExportFailure(key)
                    }
                };
                channel.send(&reply)
            }
            Request::Error(message) => {
                error!("git-annex reported an error: {}", message);
                Err(RemoteError::Protocol(format!(
                    "git-annex reported an error: {}",
                    message
                )))
            }
            Request::Unknown(line) => {
                debug!("Unsupported request: {}", line);
                channel.send(&Reply::UnsupportedRequest)
            }
        }
    }
}

fn transfer_reply(direction: Direction, key: String, result: RemoteResult<()>) -> Reply {
    match result {
        Ok(()) => Reply::TransferSuccess { direction, key },
        Err(e) => {
            warn!("{}", e);
            Reply::TransferFailure {
                direction,
                key,
                message: e.to_string(),
            }
        }
    }
}

fn remove_reply(key: String, result: RemoteResult<()>) -> Reply {
    match result {
        Ok(()) => Reply::RemoveSuccess(key),
        Err(e) => Reply::RemoveFailure {
            key,
            message: e.to_string(),
        },
    }
}

/// Serves one git-annex session over `reader` and `writer`
pub fn serve<R: BufRead, W: Write>(remote: &mut DtoolRemote, reader: R, writer: W) -> RemoteResult<()> {
    ProtocolServer::new(remote, reader, writer).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_simple_requests() {
        assert_eq!(Request::parse("PREPARE"), Request::Prepare);
        assert_eq!(Request::parse("GETCOST"), Request::GetCost);
        assert_eq!(
            Request::parse("EXTENSIONS INFO ASYNC"),
            Request::Extensions(vec!["INFO".to_string(), "ASYNC".to_string()])
        );
        assert_eq!(
            Request::parse("CLAIMURL dtool:file:///d/abc"),
            Request::ClaimUrl("dtool:file:///d/abc".to_string())
        );
    }

    #[test]
    fn test_parse_transfer_keeps_spaces_in_file() {
        assert_eq!(
            Request::parse("TRANSFER RETRIEVE MD5-s1--abc .git/annex/tmp/my file"),
            Request::Transfer {
                direction: Direction::Retrieve,
                key: "MD5-s1--abc".to_string(),
                file: ".git/annex/tmp/my file".to_string(),
            }
        );
        assert_eq!(
            Request::parse("TRANSFEREXPORT STORE k f"),
            Request::TransferExport {
                direction: Direction::Store,
                key: "k".to_string(),
                file: "f".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_malformed_requests() {
        assert!(matches!(Request::parse("CHECKPRESENT"), Request::Unknown(_)));
        assert!(matches!(Request::parse("TRANSFER SIDEWAYS k f"), Request::Unknown(_)));
        assert!(matches!(Request::parse("TRANSFER RETRIEVE k"), Request::Unknown(_)));
        assert!(matches!(Request::parse("RENAMEEXPORT k"), Request::Unknown(_)));
        assert!(matches!(Request::parse("FROBNICATE"), Request::Unknown(_)));
    }

    #[test]
    fn test_reply_formatting() {
        assert_eq!(Reply::Version(1).to_string(), "VERSION 1");
        assert_eq!(
            Reply::CheckUrlContents {
                size: None,
                name: None
            }
            .to_string(),
            "CHECKURL-CONTENTS UNKNOWN"
        );
        assert_eq!(
            Reply::CheckUrlContents {
                size: Some(5),
                name: Some("file1.txt".to_string())
            }
            .to_string(),
            "CHECKURL-CONTENTS 5 file1.txt"
        );
        assert_eq!(
            Reply::TransferFailure {
                direction: Direction::Retrieve,
                key: "k".to_string(),
                message: "first\nsecond".to_string(),
            }
            .to_string(),
            "TRANSFER-FAILURE RETRIEVE k first second"
        );
        assert_eq!(
            Reply::Availability(Availability::Global).to_string(),
            "AVAILABILITY GLOBAL"
        );
    }

    #[test]
    fn test_channel_queries() {
        let input = "VALUE file:///data/ds\nVALUE dtool:a/1\nVALUE dtool:a/2\nVALUE\n";
        let mut channel = AnnexChannel::new(Cursor::new(input), Vec::new());

        assert_eq!(
            channel.get_config("uri").unwrap().as_deref(),
            Some("file:///data/ds")
        );
        assert_eq!(
            channel.get_urls("k", "dtool:a").unwrap(),
            vec!["dtool:a/1", "dtool:a/2"]
        );
        channel.debug("multi\nline");

        let output = String::from_utf8(channel.into_writer()).unwrap();
        assert_eq!(output, "GETCONFIG uri\nGETURLS k dtool:a\nDEBUG multi line\n");
    }

    #[test]
    fn test_channel_rejects_non_value() {
        let mut channel = AnnexChannel::new(Cursor::new("CHECKPRESENT k\n"), Vec::new());
        assert!(matches!(
            channel.get_config("uri"),
            Err(RemoteError::Tracker(_))
        ));

        let mut channel = AnnexChannel::new(Cursor::new(""), Vec::new());
        assert!(channel.get_config("uri").is_err());
    }

    #[test]
    fn test_empty_value_is_unset() {
        let mut channel = AnnexChannel::new(Cursor::new("VALUE \n"), Vec::new());
        assert_eq!(channel.get_config("claim-mode").unwrap(), None);
    }
}
