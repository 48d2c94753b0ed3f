// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io::Write;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use log::*;

use crate::*;

/// Receive buffer for datagram replies, matching the traditional UDPMSGSIZE plus headroom.
const UDP_BUFFER_SIZE: usize = 8900;

/// Do an RPC call indicated by the `prog`, `vers`, and `proc`, arguments, using the given
/// `stream`.
///
/// `arg` must always be passed, but a zero-length slice can be used for a procedure which takes no
/// arguments.
///
/// This blocks the calling thread until the procedure returns a result. It returns either that
/// result as a byte vector (which the caller can decode), or an error.
pub fn do_rpc_call<S: Read + Write>(
    stream: &mut S,
    prog: u32,
    vers: u32,
    proc: u32,
    arg: &[u8],
) -> Result<Vec<u8>, Error> {
    stream_call(stream, initial_xid(), prog, vers, proc, arg)
}

fn stream_call<S: Read + Write>(
    stream: &mut S,
    xid: u32,
    prog: u32,
    vers: u32,
    proc: u32,
    arg: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut buf = buf_with_dummy_record_mark();
    buf.append(&mut encode_call(xid, prog, vers, proc, arg));

    crate::update_record_mark(&mut buf);

    stream.write_all(&buf)?;

    read_reply_from_stream(xid, stream)
}

fn encode_call(xid: u32, prog: u32, vers: u32, proc: u32, arg: &[u8]) -> Vec<u8> {
    let body = RpcMessageBody::Call(CallBody {
        rpcvers: RPC_VERSION,
        prog,
        vers,
        proc,
        cred: OpaqueAuth::none(),
        verf: OpaqueAuth::none(),
    });

    let mut buf = RpcMessage { xid, body }.serialize_alloc();
    buf.extend_from_slice(arg);
    buf
}

fn read_reply_from_stream<S: Read>(xid: u32, stream: &mut S) -> Result<Vec<u8>, crate::Error> {
    let message_length = decode_record_mark(stream)?;

    let mut buf = vec![0; message_length as usize];
    stream.read_exact(&mut buf)?;

    let (message, rest) = decode_reply(&buf)?;

    // Assuming that the stream was just used for sending the message indicated by the arg `xid`, it
    // is unexpected to get a different XID back in the reply:
    if message.xid != xid {
        return Err(Error::Protocol(ProtocolError::Decode));
    };

    accepted_results(message, rest)
}

fn decode_reply(buf: &[u8]) -> Result<(RpcMessage, &[u8]), Error> {
    let mut rest = buf;
    let message = RpcMessage::deserialize(&mut rest)?;
    Ok((message, rest))
}

/// Only continue for accepted succesful replies: anything else is returned as an error.
fn accepted_results(message: RpcMessage, rest: &[u8]) -> Result<Vec<u8>, Error> {
    // It is unexpected to receive a Call message after sending a Call message:
    let RpcMessageBody::Reply(reply) = message.body else {
        return Err(Error::Protocol(ProtocolError::Decode));
    };

    let ReplyBody::Accepted(ref arep) = reply else {
        return Err(Error::Rpc(reply));
    };
    let AcceptedReplyBody::Success = arep.reply_data else {
        return Err(Error::Rpc(reply));
    };

    // The entire header was already been decoded, so the rest of the message is the return value
    // of the RPC Call:
    Ok(rest.to_vec())
}

/// Send one call as a single datagram on a connected socket and wait up to `timeout` for the
/// matching reply. Datagrams carrying some other XID (late replies to an earlier call, for
/// example) are dropped.
pub fn datagram_call(
    socket: &UdpSocket,
    xid: u32,
    prog: u32,
    vers: u32,
    proc: u32,
    arg: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, Error> {
    socket.send(&encode_call(xid, prog, vers, proc, arg))?;

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0; UDP_BUFFER_SIZE];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Io(std::io::Error::from(ErrorKind::TimedOut)));
        }
        socket.set_read_timeout(Some(remaining))?;

        let len = socket.recv(&mut buf)?;
        let (message, rest) = match decode_reply(&buf[..len]) {
            Ok(decoded) => decoded,
            Err(_) => {
                trace!("dropping undecodable datagram of {len} bytes");
                continue;
            }
        };
        if message.xid != xid || !matches!(message.body, RpcMessageBody::Reply(_)) {
            trace!("dropping datagram with xid {:#x}, waiting for {xid:#x}", message.xid);
            continue;
        }

        return accepted_results(message, rest);
    }
}

/// How calls travel to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    /// The IP protocol number, as used in portmapper queries.
    pub fn protocol_number(self) -> u32 {
        match self {
            Self::Tcp => 6,
            Self::Udp => 17,
        }
    }
}

enum Connection {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// A connected client for one RPC program and version on one server.
pub struct RpcClient {
    conn: Connection,
    peer: SocketAddr,
    prog: u32,
    vers: u32,
    next_xid: u32,
    timeout: Duration,
}

impl RpcClient {
    pub(crate) fn from_stream(
        stream: TcpStream,
        peer: SocketAddr,
        prog: u32,
        vers: u32,
        timeout: Duration,
    ) -> Self {
        Self::new(Connection::Stream(stream), peer, prog, vers, timeout)
    }

    pub(crate) fn from_datagram(
        socket: UdpSocket,
        peer: SocketAddr,
        prog: u32,
        vers: u32,
        timeout: Duration,
    ) -> Self {
        Self::new(Connection::Datagram(socket), peer, prog, vers, timeout)
    }

    fn new(conn: Connection, peer: SocketAddr, prog: u32, vers: u32, timeout: Duration) -> Self {
        Self {
            conn,
            peer,
            prog,
            vers,
            next_xid: initial_xid(),
            timeout,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Call procedure `proc` of this client's program, blocking until the reply arrives or the
    /// timeout elapses. Returns the encoded results.
    pub fn call(&mut self, proc: u32, arg: &[u8]) -> Result<Vec<u8>, Error> {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);
        trace!(
            "{}: call prog {} vers {} proc {proc} xid {xid:#x}",
            self.peer,
            self.prog,
            self.vers
        );

        match &mut self.conn {
            Connection::Stream(stream) => {
                stream_call(stream, xid, self.prog, self.vers, proc, arg)
            }
            Connection::Datagram(socket) => datagram_call(
                socket,
                xid,
                self.prog,
                self.vers,
                proc,
                arg,
                self.timeout,
            ),
        }
    }
}
