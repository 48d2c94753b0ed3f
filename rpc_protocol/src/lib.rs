// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

pub mod client;
pub mod message;
pub mod pmap;
pub mod session;
pub mod xdr;

use std::fmt;
use std::io::{ErrorKind, Read};
use std::time::{SystemTime, UNIX_EPOCH};

use log::*;

pub use message::{
    AcceptedReply, AcceptedReplyBody, AuthFlavor, CallBody, MismatchInfo, OpaqueAuth,
    RejectedReply, ReplyBody, RpcMessage, RpcMessageBody,
};

/// Only supported version of the RPC Protocol
const RPC_VERSION: u32 = 2;

/// Largest record this client is willing to buffer. A MOUNT EXPORT reply listing thousands of
/// exports fits well within this; anything larger is a corrupt record mark.
const MAX_RECORD_SIZE: u32 = 4 << 20;

/// The possible errors that can arise from trying to make an RPC call.
#[derive(Debug)]
pub enum Error {
    Protocol(ProtocolError),
    Rpc(ReplyBody),
    Io(std::io::Error),
    /// The portmapper has no registration for the requested program, version and protocol.
    PortUnavailable,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "RPC: {e}"),
            Self::Rpc(reply) => write!(f, "RPC: {}", describe_reply(reply)),
            Self::Io(e) if is_timeout(e) => write!(f, "RPC: Timed out"),
            Self::Io(e) => write!(f, "RPC: {e}"),
            Self::PortUnavailable => write!(f, "RPC: Program not registered"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<xdr::DeserializeError> for Error {
    fn from(_: xdr::DeserializeError) -> Self {
        Self::Protocol(ProtocolError::Decode)
    }
}

impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        Self::Io(e.into())
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    /// Generic decoding error:
    Decode,

    /// Received a fragmented message. TODO: once support for message fragments is included, this
    /// variant can be removed.
    MessageFragment,

    /// Record mark claims a message larger than MAX_RECORD_SIZE:
    MessageTooLarge(u32),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode => write!(f, "Can't decode result"),
            Self::MessageFragment => write!(f, "Recieved a fragmented message"),
            Self::MessageTooLarge(len) => write!(f, "Record of {len} bytes is too large"),
        }
    }
}

/// Whether an I/O error from a socket with a read timeout set means the timeout elapsed.
pub fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn describe_reply(reply: &ReplyBody) -> String {
    match reply {
        ReplyBody::Accepted(arep) => match &arep.reply_data {
            AcceptedReplyBody::Success => "Success".to_string(),
            AcceptedReplyBody::ProgUnavail => "Program unavailable".to_string(),
            AcceptedReplyBody::ProgMismatch(m) => format!(
                "Program/version mismatch; low version = {}, high version = {}",
                m.low, m.high
            ),
            AcceptedReplyBody::ProcUnavail => "Procedure unavailable".to_string(),
            AcceptedReplyBody::GarbageArgs => "Server can't decode arguments".to_string(),
            AcceptedReplyBody::SystemErr => "Remote system error".to_string(),
        },
        ReplyBody::Denied(RejectedReply::RpcMismatch(m)) => format!(
            "Incompatible versions of RPC; low version = {}, high version = {}",
            m.low, m.high
        ),
        ReplyBody::Denied(RejectedReply::AuthError(stat)) => {
            let why = match stat {
                1 => "Invalid client credential",
                2 => "Server rejected credential",
                3 => "Invalid client verifier",
                4 => "Server rejected verifier",
                5 => "Client credential too weak",
                _ => "Unknown authentication error",
            };
            format!("Authentication error; why = {why}")
        }
    }
}

/// Given a buffer that contains an encoded message, prefaced by a dummy record mark, update that
/// record mark based on the actual length of the message.
fn update_record_mark(buf: &mut [u8]) {
    // size of message, not including the 4 bytes for the record mark itself:
    let message_size = (buf.len() - 4) as u32;
    let record_mark: u32 = message_size | (1 << 31);
    buf[..4].copy_from_slice(&record_mark.to_be_bytes());
}

/// Reads 4 bytes from the given stream, and interprets them as a record mark.
///
/// If the record mark indicates that the record is fragmented, returns an error as this
/// implementation does not yet support record fragments.
///
/// Otherwise, returns the length of the message.
fn decode_record_mark<S: Read>(stream: &mut S) -> Result<u32, crate::Error> {
    let mut record_mark_bytes: [u8; 4] = [0; 4];

    stream.read_exact(&mut record_mark_bytes).inspect_err(|e| {
        if e.kind() != ErrorKind::UnexpectedEof {
            debug!("Error getting record mark: error reading from stream: {e}");
        }
    })?;

    let record_mark = u32::from_be_bytes(record_mark_bytes);

    if (record_mark & (1 << 31)) == 0 {
        return Err(Error::Protocol(ProtocolError::MessageFragment));
    }

    let length = record_mark & (!(1 << 31));
    if length > MAX_RECORD_SIZE {
        return Err(Error::Protocol(ProtocolError::MessageTooLarge(length)));
    }

    Ok(length)
}

/// Starting point for a client's XID sequence. Mixing in the pid keeps two instances started in
/// the same instant from colliding at a server's duplicate request cache.
fn initial_xid() -> u32 {
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(0);
    clock ^ std::process::id().rotate_left(16)
}

/// Returns a buffer with space for a record mark already allocated, but a dummy value (0) encoded
/// since the length of the message isn't known yet.
fn buf_with_dummy_record_mark() -> Vec<u8> {
    vec![0, 0, 0, 0]
}
