// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! RPC Protocol version 2 message types (RFC 5531, section 9) and their XDR encoding.

use crate::xdr::{self, DeserializeError};

/// Upper bound on the body of an `opaque_auth`.
const MAX_AUTH_BYTES: usize = 400;

const CALL: u32 = 0;
const REPLY: u32 = 1;

const MSG_ACCEPTED: u32 = 0;
const MSG_DENIED: u32 = 1;

const RPC_MISMATCH: u32 = 0;
const AUTH_ERROR: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcMessage {
    pub xid: u32,
    pub body: RpcMessageBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcMessageBody {
    Call(CallBody),
    Reply(ReplyBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallBody {
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlavor {
    None,
    Sys,
    Short,
    Dh,
    RpcsecGss,
}

impl AuthFlavor {
    fn to_u32(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Sys => 1,
            Self::Short => 2,
            Self::Dh => 3,
            Self::RpcsecGss => 6,
        }
    }

    fn from_u32(n: u32) -> Result<Self, DeserializeError> {
        match n {
            0 => Ok(Self::None),
            1 => Ok(Self::Sys),
            2 => Ok(Self::Short),
            3 => Ok(Self::Dh),
            6 => Ok(Self::RpcsecGss),
            _ => Err(DeserializeError),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueAuth {
    pub flavor: AuthFlavor,
    pub body: Vec<u8>,
}

impl OpaqueAuth {
    /// AUTH_NONE: MOUNT does not need credentials, since a MNT reply just lists the flavors the
    /// server will accept for NFS itself.
    pub fn none() -> Self {
        OpaqueAuth {
            flavor: AuthFlavor::None,
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    Accepted(AcceptedReply),
    Denied(RejectedReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedReply {
    pub verf: OpaqueAuth,
    pub reply_data: AcceptedReplyBody,
}

/// The results of a successful call are not part of this type: they follow the reply header in
/// the message, and are decoded by the caller based on which procedure it called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptedReplyBody {
    Success,
    ProgUnavail,
    ProgMismatch(MismatchInfo),
    ProcUnavail,
    GarbageArgs,
    SystemErr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MismatchInfo {
    pub low: u32,
    pub high: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectedReply {
    RpcMismatch(MismatchInfo),
    /// Carries the raw `auth_stat` value.
    AuthError(u32),
}

impl OpaqueAuth {
    fn serialize_into(&self, buf: &mut Vec<u8>) {
        xdr::put_u32(buf, self.flavor.to_u32());
        xdr::put_opaque(buf, &self.body);
    }

    fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        let flavor = AuthFlavor::from_u32(xdr::get_u32(input)?)?;
        let body = xdr::get_opaque(input, Some(MAX_AUTH_BYTES))?;
        Ok(Self { flavor, body })
    }
}

impl MismatchInfo {
    fn serialize_into(&self, buf: &mut Vec<u8>) {
        xdr::put_u32(buf, self.low);
        xdr::put_u32(buf, self.high);
    }

    fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        Ok(Self {
            low: xdr::get_u32(input)?,
            high: xdr::get_u32(input)?,
        })
    }
}

impl RpcMessage {
    pub fn serialize_alloc(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        xdr::put_u32(&mut buf, self.xid);
        match &self.body {
            RpcMessageBody::Call(call) => {
                xdr::put_u32(&mut buf, CALL);
                xdr::put_u32(&mut buf, call.rpcvers);
                xdr::put_u32(&mut buf, call.prog);
                xdr::put_u32(&mut buf, call.vers);
                xdr::put_u32(&mut buf, call.proc);
                call.cred.serialize_into(&mut buf);
                call.verf.serialize_into(&mut buf);
            }
            RpcMessageBody::Reply(reply) => {
                xdr::put_u32(&mut buf, REPLY);
                reply.serialize_into(&mut buf);
            }
        };
        buf
    }

    /// Decode a message header. On success `input` is left pointing at whatever follows the
    /// header: the procedure arguments of a call, or the results of a successful reply.
    pub fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        let xid = xdr::get_u32(input)?;
        let body = match xdr::get_u32(input)? {
            CALL => RpcMessageBody::Call(CallBody {
                rpcvers: xdr::get_u32(input)?,
                prog: xdr::get_u32(input)?,
                vers: xdr::get_u32(input)?,
                proc: xdr::get_u32(input)?,
                cred: OpaqueAuth::deserialize(input)?,
                verf: OpaqueAuth::deserialize(input)?,
            }),
            REPLY => RpcMessageBody::Reply(ReplyBody::deserialize(input)?),
            _ => return Err(DeserializeError),
        };
        Ok(Self { xid, body })
    }
}

impl ReplyBody {
    fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Accepted(arep) => {
                xdr::put_u32(buf, MSG_ACCEPTED);
                arep.verf.serialize_into(buf);
                match &arep.reply_data {
                    AcceptedReplyBody::Success => xdr::put_u32(buf, 0),
                    AcceptedReplyBody::ProgUnavail => xdr::put_u32(buf, 1),
                    AcceptedReplyBody::ProgMismatch(info) => {
                        xdr::put_u32(buf, 2);
                        info.serialize_into(buf);
                    }
                    AcceptedReplyBody::ProcUnavail => xdr::put_u32(buf, 3),
                    AcceptedReplyBody::GarbageArgs => xdr::put_u32(buf, 4),
                    AcceptedReplyBody::SystemErr => xdr::put_u32(buf, 5),
                };
            }
            Self::Denied(rej) => {
                xdr::put_u32(buf, MSG_DENIED);
                match rej {
                    RejectedReply::RpcMismatch(info) => {
                        xdr::put_u32(buf, RPC_MISMATCH);
                        info.serialize_into(buf);
                    }
                    RejectedReply::AuthError(stat) => {
                        xdr::put_u32(buf, AUTH_ERROR);
                        xdr::put_u32(buf, *stat);
                    }
                };
            }
        };
    }

    fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        match xdr::get_u32(input)? {
            MSG_ACCEPTED => {
                let verf = OpaqueAuth::deserialize(input)?;
                let reply_data = match xdr::get_u32(input)? {
                    0 => AcceptedReplyBody::Success,
                    1 => AcceptedReplyBody::ProgUnavail,
                    2 => AcceptedReplyBody::ProgMismatch(MismatchInfo::deserialize(input)?),
                    3 => AcceptedReplyBody::ProcUnavail,
                    4 => AcceptedReplyBody::GarbageArgs,
                    5 => AcceptedReplyBody::SystemErr,
                    _ => return Err(DeserializeError),
                };
                Ok(Self::Accepted(AcceptedReply { verf, reply_data }))
            }
            MSG_DENIED => match xdr::get_u32(input)? {
                RPC_MISMATCH => Ok(Self::Denied(RejectedReply::RpcMismatch(
                    MismatchInfo::deserialize(input)?,
                ))),
                AUTH_ERROR => Ok(Self::Denied(RejectedReply::AuthError(xdr::get_u32(input)?))),
                _ => Err(DeserializeError),
            },
            _ => Err(DeserializeError),
        }
    }
}
