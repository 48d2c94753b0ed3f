// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Running a single MOUNT query against a connected client, with timing.

use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;

use crate::clock::{self, Monotonic};
use crate::config::Config;
use crate::mount_proto::{ExportEntry, FileHandle, MountRes3, MountStat};
use crate::report::{Event, Reporter};
use crate::session::MountClient;

/// How a filehandle lookup turned out.
#[derive(Debug)]
pub enum Status {
    Ok(FileHandle),
    /// The server replied, but refused.
    ProtocolError(MountStat),
    /// No reply: timeout, connection reset, RPC-level rejection, undecodable reply...
    TransportError(rpc_protocol::Error),
    /// The path was malformed, so nothing was sent.
    InvalidPath,
}

/// The outcome of one MNT call.
#[derive(Debug)]
pub struct QueryResult {
    /// The path as it was sent, byte for byte.
    pub path: OsString,
    pub status: Status,
    /// Round trip time of the call. Absent when there was no reply to time.
    pub elapsed: Option<Duration>,
    /// Wall clock seconds, taken just before the call.
    pub timestamp: u64,
}

impl QueryResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok(_))
    }

    pub fn filehandle(&self) -> Option<&FileHandle> {
        match &self.status {
            Status::Ok(fh) => Some(fh),
            _ => None,
        }
    }
}

/// Only absolute paths are sent to the server.
pub fn valid_path(path: &OsStr) -> bool {
    path.as_bytes().first() == Some(&b'/')
}

/// Look up the root filehandle for `path` on the server behind `client`.
///
/// An MNT3ERR_ACCES reply to an unprivileged client additionally gets a hint reported, since
/// servers commonly refuse requests that don't come from a reserved port.
pub fn lookup_filehandle<C: MountClient + ?Sized>(
    client: &mut C,
    host: &str,
    path: impl AsRef<OsStr>,
    config: &Config,
    reporter: &mut dyn Reporter,
) -> QueryResult {
    let path = path.as_ref();
    let timestamp = clock::wall_clock_secs();

    if !valid_path(path) {
        return QueryResult {
            path: path.to_os_string(),
            status: Status::InvalidPath,
            elapsed: None,
            timestamp,
        };
    }

    let start = Monotonic::now();
    let res = client.mnt(path);
    let elapsed = Monotonic::now().since(start);

    let (status, elapsed) = match res {
        Ok(MountRes3::Ok(info)) => (Status::Ok(info.fhandle), Some(elapsed)),
        Ok(MountRes3::Err(stat)) => {
            if stat == MountStat::Acces && !config.privileged {
                reporter.report(Event::PrivilegedPortHint {
                    host: host.to_string(),
                    path: path.to_string_lossy().into_owned(),
                });
            }
            (Status::ProtocolError(stat), Some(elapsed))
        }
        Err(e) => (Status::TransportError(e), None),
    };

    QueryResult {
        path: path.to_os_string(),
        status,
        elapsed,
        timestamp,
    }
}

/// Ask the server for its export list.
///
/// A failed call is returned as an error rather than as an empty list, so callers can tell a
/// server with nothing exported from one that didn't answer.
pub fn list_exports<C: MountClient + ?Sized>(
    client: &mut C,
) -> Result<Vec<ExportEntry>, rpc_protocol::Error> {
    client.export()
}
