// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Client for the version 2 portmapper (RFC 1833, section 3), used to find which port a server's
//! RPC program is listening on.

use log::*;

use std::io::{Read, Write};

use crate::client::*;
use crate::xdr;
use crate::*;

pub const PMAP_PROGRAM: u32 = 100000;

pub const PMAP_PORT: u16 = 111;

#[allow(non_snake_case)]
pub mod PMAP_V2 {
    pub const VERSION: u32 = 2;
    pub const PMAPPROC_GETPORT: u32 = 3;
}

/// The `mapping` argument to PMAPPROC_GETPORT. The port field is ignored by the server for
/// GETPORT queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
    pub port: u32,
}

impl Mapping {
    pub fn query(prog: u32, vers: u32, transport: Transport) -> Self {
        Self {
            prog,
            vers,
            prot: transport.protocol_number(),
            port: 0,
        }
    }

    pub fn serialize_alloc(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16);
        xdr::put_u32(&mut buf, self.prog);
        xdr::put_u32(&mut buf, self.vers);
        xdr::put_u32(&mut buf, self.prot);
        xdr::put_u32(&mut buf, self.port);
        buf
    }
}

/// Ask the portmapper on the other end of `stream` which port `mapping` is registered on.
pub fn getport_using_stream<S: Read + Write>(
    mapping: Mapping,
    stream: &mut S,
) -> Result<u16, Error> {
    let res = do_rpc_call(
        stream,
        PMAP_PROGRAM,
        PMAP_V2::VERSION,
        PMAP_V2::PMAPPROC_GETPORT,
        &mapping.serialize_alloc(),
    )?;

    decode_port(&res)
}

/// Like [getport_using_stream], over an already connected portmapper client.
pub fn getport(mapping: Mapping, client: &mut RpcClient) -> Result<u16, Error> {
    debug!(
        "{}: portmapper GETPORT prog {} vers {} prot {}",
        client.peer(),
        mapping.prog,
        mapping.vers,
        mapping.prot
    );

    let res = client.call(PMAP_V2::PMAPPROC_GETPORT, &mapping.serialize_alloc())?;

    decode_port(&res)
}

fn decode_port(res: &[u8]) -> Result<u16, Error> {
    let port = xdr::get_u32(&mut &res[..])?;
    match port {
        0 => Err(Error::PortUnavailable),
        p => u16::try_from(p).map_err(|_| Error::Protocol(ProtocolError::Decode)),
    }
}
