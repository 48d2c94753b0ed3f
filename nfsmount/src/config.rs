// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::Ipv4Addr;
use std::time::Duration;

use rpc_protocol::client::Transport;
use rpc_protocol::session::SessionParams;

/// Per-call timeout handed to the RPC layer.
pub const NFS_TIMEOUT: Duration = Duration::from_millis(2500);

/// Settings for a whole run. Built once at startup and only ever borrowed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// List exports like `showmount -e` instead of looking up filehandles.
    pub show_exports: bool,

    /// Rerun the whole target list until the process is killed.
    pub loop_forever: bool,

    /// Query every IPv4 address a host name resolves to, not just the first.
    pub multiple: bool,

    pub transport: Transport,

    /// Report progress (each connection attempt) on the diagnostic channel.
    pub verbose: bool,

    /// Local address to send queries from.
    pub source: Option<Ipv4Addr>,

    pub timeout: Duration,

    /// Whether the process runs as root, and so can use a reserved source port.
    pub privileged: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            show_exports: false,
            loop_forever: false,
            multiple: false,
            transport: Transport::Udp,
            verbose: false,
            source: None,
            timeout: NFS_TIMEOUT,
            privileged: false,
        }
    }
}

impl Config {
    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            transport: self.transport,
            timeout: self.timeout,
            source: self.source,
            reserved_port: self.privileged,
        }
    }
}
