// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The seam between the query logic and the RPC layer: a connected MOUNT client, and something that
//! can produce one for a target.

use std::ffi::OsStr;

use log::*;

use rpc_protocol::client::RpcClient;
use rpc_protocol::session;
use rpc_protocol::Error;

use crate::config::Config;
use crate::mount_proto::*;
use crate::target::Target;

/// The two MOUNT procedures the queries use.
pub trait MountClient {
    /// MOUNTPROC3_MNT. An `Err` means no reply could be obtained at all.
    fn mnt(&mut self, path: &OsStr) -> Result<MountRes3, Error>;

    /// MOUNTPROC3_EXPORT, entries in the order the server listed them.
    fn export(&mut self) -> Result<Vec<ExportEntry>, Error>;
}

/// Establishes a fresh client for a target. Called at the start of every pass.
pub trait Connector {
    type Client: MountClient;

    fn connect(&mut self, target: &Target, config: &Config) -> Result<Self::Client, Error>;
}

impl MountClient for RpcClient {
    fn mnt(&mut self, path: &OsStr) -> Result<MountRes3, Error> {
        let res = self.call(MOUNT_V3::MOUNTPROC3_MNT, &dirpath_arg(path))?;
        Ok(MountRes3::deserialize(&mut res.as_slice())?)
    }

    fn export(&mut self) -> Result<Vec<ExportEntry>, Error> {
        let res = self.call(MOUNT_V3::MOUNTPROC3_EXPORT, &[0u8; 0])?;
        let exports = Exports::deserialize(&mut res.as_slice())?;
        Ok(exports.inner)
    }
}

/// Connects to the real MOUNT service, locating it through the server's portmapper.
#[derive(Debug, Default)]
pub struct RpcConnector;

impl Connector for RpcConnector {
    type Client = RpcClient;

    fn connect(&mut self, target: &Target, config: &Config) -> Result<RpcClient, Error> {
        let client = session::create_client(
            target.addr,
            MOUNT_PROGRAM,
            MOUNT_V3::VERSION,
            &config.session_params(),
        )?;
        debug!("{} ({}): connected to {}", target.name, target.addr, client.peer());
        Ok(client)
    }
}
