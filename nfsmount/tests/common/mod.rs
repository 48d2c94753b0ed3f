// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! In-memory stand-ins for the RPC layer and the output channels.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::rc::Rc;

use nfsmount::mount_proto::*;
use nfsmount::report::{Event, Reporter};
use nfsmount::session::{Connector, MountClient};
use nfsmount::target::Target;
use nfsmount::Config;
use rpc_protocol::Error;

/// What a fake server answers to MNT for one path.
#[derive(Debug, Clone)]
pub enum MntReply {
    Handle(Vec<u8>),
    Status(MountStat),
    NoReply,
}

#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    pub mnt: HashMap<OsString, MntReply>,
    /// `None` makes the EXPORT call fail.
    pub exports: Option<Vec<ExportEntry>>,
}

impl FakeServer {
    pub fn with_mount(mut self, path: impl AsRef<OsStr>, reply: MntReply) -> Self {
        self.mnt.insert(path.as_ref().to_os_string(), reply);
        self
    }

    pub fn with_exports(mut self, entries: Vec<ExportEntry>) -> Self {
        self.exports = Some(entries);
        self
    }
}

pub struct FakeClient {
    server: FakeServer,
    calls: Rc<Cell<usize>>,
}

impl FakeClient {
    pub fn new(server: FakeServer) -> Self {
        Self {
            server,
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl MountClient for FakeClient {
    fn mnt(&mut self, path: &OsStr) -> Result<MountRes3, Error> {
        self.calls.set(self.calls.get() + 1);
        match self.server.mnt.get(path) {
            Some(MntReply::Handle(data)) => Ok(MountRes3::Ok(MountInfo {
                fhandle: FileHandle { data: data.clone() },
                auth_flavors: vec![1],
            })),
            Some(MntReply::Status(stat)) => Ok(MountRes3::Err(*stat)),
            Some(MntReply::NoReply) => Err(Error::Io(ErrorKind::TimedOut.into())),
            None => Ok(MountRes3::Err(MountStat::NoEnt)),
        }
    }

    fn export(&mut self) -> Result<Vec<ExportEntry>, Error> {
        self.calls.set(self.calls.get() + 1);
        self.server
            .exports
            .clone()
            .ok_or(Error::Io(ErrorKind::TimedOut.into()))
    }
}

/// Hands out clients for the servers it knows about, and refuses connections to anything else.
#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<Ipv4Addr, FakeServer>,
    pub connects: usize,
    pub calls: Rc<Cell<usize>>,
}

impl FakeConnector {
    pub fn with_server(mut self, addr: Ipv4Addr, server: FakeServer) -> Self {
        self.servers.insert(addr, server);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Connector for FakeConnector {
    type Client = FakeClient;

    fn connect(&mut self, target: &Target, _config: &Config) -> Result<FakeClient, Error> {
        self.connects += 1;
        let Some(server) = self.servers.get(&target.addr) else {
            return Err(Error::Io(ErrorKind::ConnectionRefused.into()));
        };
        Ok(FakeClient {
            server: server.clone(),
            calls: Rc::clone(&self.calls),
        })
    }
}

#[derive(Debug, Default)]
pub struct Collect {
    pub events: Vec<Event>,
}

impl Reporter for Collect {
    fn report(&mut self, event: Event) {
        self.events.push(event);
    }
}

pub const HOST1: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const HOST2: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);
