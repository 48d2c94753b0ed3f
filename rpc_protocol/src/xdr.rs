// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Minimal XDR (RFC 4506) primitives used by the RPC message types and by the program-specific
//! argument and result types built on top of this crate.
//!
//! Decoding functions take a `&mut &[u8]` and advance it past whatever they consumed, so a series
//! of calls walks through an encoded message field by field.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::{OsStrExt, OsStringExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeserializeError;

impl std::error::Error for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input to deserialize method")
    }
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], DeserializeError> {
    if input.len() < len {
        return Err(DeserializeError);
    }
    let (bytes, rest) = input.split_at(len);
    *input = rest;
    Ok(bytes)
}

pub fn get_u32(input: &mut &[u8]) -> Result<u32, DeserializeError> {
    let bytes = take(input, 4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn get_bool(input: &mut &[u8]) -> Result<bool, DeserializeError> {
    match get_u32(input)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DeserializeError),
    }
}

/// Variable-length opaque data: a length, the bytes, then padding up to a multiple of 4.
///
/// `max` is the upper bound from the protocol definition (e.g. `opaque fhandle3<FHSIZE3>`), if
/// there is one.
pub fn get_opaque(input: &mut &[u8], max: Option<usize>) -> Result<Vec<u8>, DeserializeError> {
    let len = get_u32(input)? as usize;
    if max.is_some_and(|max| len > max) {
        return Err(DeserializeError);
    }
    let bytes = take(input, len)?.to_vec();
    take(input, padding(len))?;
    Ok(bytes)
}

/// An XDR string. The bytes are kept as they are: servers are free to name things in whatever
/// encoding their filesystem uses, and a name has to go back to the server unchanged.
pub fn get_string(input: &mut &[u8], max: Option<usize>) -> Result<OsString, DeserializeError> {
    get_opaque(input, max).map(OsString::from_vec)
}

pub fn put_u32(buf: &mut Vec<u8>, n: u32) {
    buf.extend_from_slice(&n.to_be_bytes());
}

pub fn put_bool(buf: &mut Vec<u8>, b: bool) {
    put_u32(buf, b as u32);
}

pub fn put_opaque(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
    buf.extend_from_slice(&[0; 3][..padding(bytes.len())]);
}

pub fn put_string(buf: &mut Vec<u8>, s: &OsStr) {
    put_opaque(buf, s.as_bytes());
}

/// Bytes needed to pad `len` to a multiple of 4.
fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_is_padded() {
        let mut buf = Vec::new();
        put_opaque(&mut buf, &[0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert_eq!(buf.len(), 4 + 8);
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);
        assert_eq!(&buf[9..], &[0, 0, 0]);

        let mut input = buf.as_slice();
        let bytes = get_opaque(&mut input, None).unwrap();
        assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert!(input.is_empty());
    }

    #[test]
    fn opaque_over_limit() {
        let mut buf = Vec::new();
        put_opaque(&mut buf, &[7; 65]);
        assert_eq!(get_opaque(&mut buf.as_slice(), Some(64)), Err(DeserializeError));
    }

    #[test]
    fn truncated_input() {
        let bad = [0, 0, 0, 9, b'a', b'b'];
        assert_eq!(get_string(&mut bad.as_slice(), None), Err(DeserializeError));
        assert_eq!(get_u32(&mut [0u8, 1].as_slice()), Err(DeserializeError));
    }

    #[test]
    fn string_bytes_survive() {
        let latin1 = OsStr::from_bytes(b"/caf\xe9");
        let mut buf = Vec::new();
        put_string(&mut buf, latin1);
        assert_eq!(buf, b"\0\0\0\x05/caf\xe9\0\0\0".to_vec());

        let mut input = buf.as_slice();
        assert_eq!(get_string(&mut input, Some(8)).unwrap(), latin1);
        assert!(input.is_empty());
    }

    #[test]
    fn invalid_bool() {
        assert_eq!(get_bool(&mut [0u8, 0, 0, 2].as_slice()), Err(DeserializeError));
        assert_eq!(get_bool(&mut [0u8, 0, 0, 1].as_slice()), Ok(true));
    }
}
