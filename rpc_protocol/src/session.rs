// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Establishing client sessions: socket setup, optional source address and reserved port binding,
//! and portmapper resolution of the server's port.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, UdpSocket};
use std::ops::RangeInclusive;
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use log::*;
use nix::errno::Errno;
use nix::sys::socket::{
    bind, connect, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
};
use nix::sys::time::{TimeVal, TimeValLike};

use crate::client::{RpcClient, Transport};
use crate::pmap::{self, Mapping, PMAP_PORT, PMAP_PROGRAM, PMAP_V2};
use crate::Error;

/// Ports a privileged client may bind, as `bindresvport(3)` uses.
const RESERVED_PORTS: RangeInclusive<u16> = 512..=1023;

/// Parameters for establishing a session that apply regardless of which program is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub transport: Transport,

    /// Bounds connection establishment and each call.
    pub timeout: Duration,

    /// Local address to send from. When `None` the kernel picks.
    pub source: Option<Ipv4Addr>,

    /// Whether to bind a source port below 1024. Only root can do this, and some servers refuse
    /// MNT requests from anything else.
    pub reserved_port: bool,
}

/// Create a client for `prog`/`vers` on `server`, asking the server's portmapper which port the
/// program listens on first.
pub fn create_client(
    server: Ipv4Addr,
    prog: u32,
    vers: u32,
    params: &SessionParams,
) -> Result<RpcClient, Error> {
    let pmap_params = SessionParams {
        reserved_port: false,
        ..*params
    };
    let mut portmapper = connect_client(
        SocketAddrV4::new(server, PMAP_PORT),
        PMAP_PROGRAM,
        PMAP_V2::VERSION,
        &pmap_params,
    )?;
    let port = pmap::getport(
        Mapping::query(prog, vers, params.transport),
        &mut portmapper,
    )?;
    debug!("{server}: program {prog} version {vers} is on port {port}");

    connect_client(SocketAddrV4::new(server, port), prog, vers, params)
}

/// Create a client for `prog`/`vers` at a known address, skipping the portmapper.
pub fn connect_client(
    addr: SocketAddrV4,
    prog: u32,
    vers: u32,
    params: &SessionParams,
) -> Result<RpcClient, Error> {
    debug!("connecting to {addr} over {:?}", params.transport);

    let fd = open_socket(params)?;
    let peer = SocketAddr::V4(addr);

    match params.transport {
        Transport::Tcp => {
            // SO_SNDTIMEO also bounds a blocking connect on Linux.
            setsockopt(&fd, sockopt::SendTimeout, &timeval(params.timeout))?;
            match connect(fd.as_raw_fd(), &SockaddrIn::from(addr)) {
                Ok(()) => {}
                Err(Errno::EINPROGRESS) | Err(Errno::EAGAIN) => {
                    return Err(Error::Io(std::io::ErrorKind::TimedOut.into()))
                }
                Err(e) => return Err(e.into()),
            };
            let stream = TcpStream::from(fd);
            stream.set_read_timeout(Some(params.timeout))?;
            stream.set_write_timeout(Some(params.timeout))?;
            Ok(RpcClient::from_stream(
                stream,
                peer,
                prog,
                vers,
                params.timeout,
            ))
        }
        Transport::Udp => {
            connect(fd.as_raw_fd(), &SockaddrIn::from(addr))?;
            let socket = UdpSocket::from(fd);
            socket.set_read_timeout(Some(params.timeout))?;
            Ok(RpcClient::from_datagram(
                socket,
                peer,
                prog,
                vers,
                params.timeout,
            ))
        }
    }
}

fn open_socket(params: &SessionParams) -> Result<OwnedFd, Error> {
    let ty = match params.transport {
        Transport::Tcp => SockType::Stream,
        Transport::Udp => SockType::Datagram,
    };
    let fd = socket(AddressFamily::Inet, ty, SockFlag::empty(), None)?;

    let source = params.source.unwrap_or(Ipv4Addr::UNSPECIFIED);
    if params.reserved_port {
        bind_reserved(&fd, source)?;
    } else if params.source.is_some() {
        bind(fd.as_raw_fd(), &SockaddrIn::from(SocketAddrV4::new(source, 0)))?;
    }

    Ok(fd)
}

/// Bind the highest free port in RESERVED_PORTS. If the process turns out not to be allowed to
/// bind privileged ports at all, fall back to an ordinary ephemeral port.
fn bind_reserved(fd: &OwnedFd, source: Ipv4Addr) -> Result<(), Error> {
    for port in RESERVED_PORTS.rev() {
        match bind(fd.as_raw_fd(), &SockaddrIn::from(SocketAddrV4::new(source, port))) {
            Ok(()) => {
                trace!("bound reserved source port {port}");
                return Ok(());
            }
            Err(Errno::EADDRINUSE) => continue,
            Err(Errno::EACCES) => {
                warn!("not permitted to bind a reserved port, using an unprivileged one");
                bind(fd.as_raw_fd(), &SockaddrIn::from(SocketAddrV4::new(source, 0)))?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Io(std::io::ErrorKind::AddrInUse.into()))
}

fn timeval(timeout: Duration) -> TimeVal {
    TimeVal::microseconds(timeout.as_micros() as i64)
}
