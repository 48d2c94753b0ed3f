// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Classifying query outcomes, counting them, and reporting them.
//!
//! Everything the query loop has to say goes through a [Reporter] as an [Event]. The console
//! implementation sends results (filehandle records and export listings) to one writer and
//! diagnostics to another.

use std::io::{self, Stderr, Stdout, Write};
use std::net::Ipv4Addr;

use log::*;
use serde::Serialize;

use crate::mount_proto::{ExportEntry, MountStat};
use crate::query::{QueryResult, Status};
use crate::target::Target;

/// One successful filehandle lookup, as written to the output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilehandleRecord {
    pub host: String,
    pub ip: Ipv4Addr,
    pub path: String,
    /// Hex encoded.
    pub filehandle: String,
    pub usec: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Only emitted in verbose mode.
    Connecting { host: String, addr: Ipv4Addr },
    ConnectFailed {
        host: String,
        addr: Ipv4Addr,
        error: String,
    },
    Filehandle(FilehandleRecord),
    Exports {
        host: String,
        entries: Vec<ExportEntry>,
    },
    ExportsFailed { host: String, error: String },
    InvalidPath { host: String, path: String },
    ProtocolError {
        host: String,
        path: String,
        status: MountStat,
    },
    PrivilegedPortHint { host: String, path: String },
    TransportError {
        host: String,
        path: String,
        error: String,
    },
}

pub trait Reporter {
    fn report(&mut self, event: Event);
}

/// Turn a query result into the event that describes it.
pub fn classify(target: &Target, result: &QueryResult) -> Event {
    let host = target.name.clone();
    let path = result.path.to_string_lossy().into_owned();
    match &result.status {
        Status::Ok(fh) => Event::Filehandle(FilehandleRecord {
            host,
            ip: target.addr,
            path,
            filehandle: fh.to_hex(),
            usec: result
                .elapsed
                .map(|d| d.as_micros() as u64)
                .unwrap_or_default(),
            timestamp: result.timestamp,
        }),
        Status::ProtocolError(status) => Event::ProtocolError {
            host,
            path,
            status: *status,
        },
        Status::TransportError(e) => Event::TransportError {
            host,
            path,
            error: e.to_string(),
        },
        Status::InvalidPath => Event::InvalidPath { host, path },
    }
}

/// Running totals that decide the exit status of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: u64,
    pub ok: u64,
}

impl Tally {
    /// Count a filehandle lookup and report it.
    pub fn record(&mut self, target: &Target, result: QueryResult, reporter: &mut dyn Reporter) {
        self.attempted += 1;
        if result.is_ok() {
            self.ok += 1;
        }
        reporter.report(classify(target, &result));
    }

    /// Count a showmount style listing. The listing was one call, so its entries all succeeded
    /// together.
    pub fn record_listing(&mut self, entries: usize) {
        self.attempted += entries as u64;
        self.ok += entries as u64;
    }

    /// Count an export enumeration that got no reply as one failed attempt.
    pub fn record_enumeration_failure(&mut self) {
        self.attempted += 1;
    }

    /// A run succeeds when something was queried and everything queried succeeded.
    pub fn success(&self) -> bool {
        self.attempted > 0 && self.ok == self.attempted
    }
}

/// Writes results to `out` and diagnostics to `err`.
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl ConsoleReporter<Stdout, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn write_event(&mut self, event: &Event) -> io::Result<()> {
        match event {
            Event::Filehandle(record) => {
                serde_json::to_writer(&mut self.out, record)?;
                writeln!(self.out)?;
                self.out.flush()
            }
            Event::Exports { host, entries } => {
                self.out.write_all(format_exports(host, entries).as_bytes())?;
                self.out.flush()
            }
            Event::Connecting { host, addr } => writeln!(self.err, "{host} ({addr}): connecting"),
            Event::ConnectFailed { host, addr, error } => {
                writeln!(self.err, "{host} ({addr}): {error}")
            }
            Event::ExportsFailed { host, error } => {
                writeln!(self.err, "{host}: mountproc_export_3: {error}")
            }
            Event::InvalidPath { host, path } => writeln!(self.err, "{host}: Invalid path: {path}"),
            Event::ProtocolError { host, path, status } => {
                writeln!(self.err, "{host}:{path}: {status}")
            }
            Event::PrivilegedPortHint { host, path } => writeln!(
                self.err,
                "{host}:{path}: Unable to mount filesystem, consider running as root"
            ),
            Event::TransportError { host, path, error } => {
                writeln!(self.err, "{host}:{path}: mountproc_mnt_3: {error}")
            }
        }
    }
}

impl<O: Write, E: Write> Reporter for ConsoleReporter<O, E> {
    fn report(&mut self, event: Event) {
        if let Err(e) = self.write_event(&event) {
            warn!("failed to write {event:?}: {e}");
        }
    }
}

/// Format an export list the way `showmount -e` does, one line per export with the directory
/// padded to line the group lists up.
pub fn format_exports(host: &str, entries: &[ExportEntry]) -> String {
    let dirs: Vec<_> = entries.iter().map(|e| e.dir.to_string_lossy()).collect();
    let width = dirs.iter().map(|d| d.chars().count()).max().unwrap_or(0) + 1;

    let mut out = String::new();
    for (entry, dir) in entries.iter().zip(dirs.iter()) {
        let groups = if entry.groups.is_empty() {
            "(everyone)".to_string()
        } else {
            let names: Vec<_> = entry.groups.iter().map(|g| g.to_string_lossy()).collect();
            names.join(",")
        };
        out.push_str(&format!("{host}:{dir:<width$}{groups}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_needs_an_attempt() {
        let mut tally = Tally::default();
        assert!(!tally.success());

        tally.record_listing(0);
        assert!(!tally.success());

        tally.record_listing(2);
        assert!(tally.success());

        tally.record_enumeration_failure();
        assert_eq!(tally, Tally { attempted: 3, ok: 2 });
        assert!(!tally.success());
    }

    #[test]
    fn export_columns() {
        let entries = vec![
            ExportEntry::new("/a", &[]),
            ExportEntry::new("/b", &["g1", "g2"]),
            ExportEntry::new("/longer", &["h"]),
        ];
        assert_eq!(
            format_exports("srv", &entries),
            "srv:/a      (everyone)\nsrv:/b      g1,g2\nsrv:/longer h\n"
        );
    }

    #[test]
    fn export_names_shown_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let entries = vec![
            ExportEntry::new(OsStr::from_bytes(b"/caf\xe9"), &[]),
            ExportEntry::new("/b", &["g1"]),
        ];
        assert_eq!(
            format_exports("srv", &entries),
            "srv:/caf\u{fffd} (everyone)\nsrv:/b    g1\n"
        );
    }

    #[test]
    fn diagnostics_go_to_err() {
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
        reporter.report(Event::ProtocolError {
            host: "host1".to_string(),
            path: "/export".to_string(),
            status: MountStat::Unknown(77),
        });
        reporter.report(Event::InvalidPath {
            host: "host1".to_string(),
            path: "export".to_string(),
        });
        let (out, err) = reporter.into_inner();
        assert!(out.is_empty());
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "host1:/export: 77\nhost1: Invalid path: export\n"
        );
    }

    #[test]
    fn filehandle_record_is_json() {
        let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new());
        reporter.report(Event::Filehandle(FilehandleRecord {
            host: "host1".to_string(),
            ip: Ipv4Addr::new(192, 0, 2, 1),
            path: "/export".to_string(),
            filehandle: "deadbeef".to_string(),
            usec: 412,
            timestamp: 1_700_000_000,
        }));
        let (out, err) = reporter.into_inner();
        assert!(err.is_empty());
        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["host"], "host1");
        assert_eq!(value["ip"], "192.0.2.1");
        assert_eq!(value["filehandle"], "deadbeef");
        assert_eq!(value["usec"], 412);
        assert_eq!(value["timestamp"], 1_700_000_000);
    }
}
