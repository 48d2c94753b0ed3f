// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! MOUNT protocol version 3 types (RFC 1813, Appendix I) and their XDR encoding.

use std::ffi::{OsStr, OsString};
use std::fmt;

use rpc_protocol::xdr::{self, DeserializeError};

pub const MOUNT_PROGRAM: u32 = 100005;

#[allow(non_snake_case)]
pub mod MOUNT_V3 {
    pub const VERSION: u32 = 3;
    pub const MOUNTPROC3_MNT: u32 = 1;
    pub const MOUNTPROC3_EXPORT: u32 = 5;
}

/// Maximum bytes in a path name
pub const MNTPATHLEN: usize = 1024;
/// Maximum bytes in a name
pub const MNTNAMLEN: usize = 255;
/// Maximum bytes in a V3 file handle
pub const FHSIZE3: usize = 64;

/// `mountstat3`. Codes outside the RFC's list are kept as-is so they can still be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStat {
    Ok,
    Perm,
    NoEnt,
    Io,
    Acces,
    NotDir,
    Inval,
    NameTooLong,
    NotSupp,
    ServerFault,
    Unknown(u32),
}

impl MountStat {
    pub fn from_u32(n: u32) -> Self {
        match n {
            0 => Self::Ok,
            1 => Self::Perm,
            2 => Self::NoEnt,
            5 => Self::Io,
            13 => Self::Acces,
            20 => Self::NotDir,
            22 => Self::Inval,
            63 => Self::NameTooLong,
            10004 => Self::NotSupp,
            10006 => Self::ServerFault,
            n => Self::Unknown(n),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::Perm => 1,
            Self::NoEnt => 2,
            Self::Io => 5,
            Self::Acces => 13,
            Self::NotDir => 20,
            Self::Inval => 22,
            Self::NameTooLong => 63,
            Self::NotSupp => 10004,
            Self::ServerFault => 10006,
            Self::Unknown(n) => n,
        }
    }

    /// The constant's name from the protocol definition, if this is a known code.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Ok => Some("MNT3_OK"),
            Self::Perm => Some("MNT3ERR_PERM"),
            Self::NoEnt => Some("MNT3ERR_NOENT"),
            Self::Io => Some("MNT3ERR_IO"),
            Self::Acces => Some("MNT3ERR_ACCES"),
            Self::NotDir => Some("MNT3ERR_NOTDIR"),
            Self::Inval => Some("MNT3ERR_INVAL"),
            Self::NameTooLong => Some("MNT3ERR_NAMETOOLONG"),
            Self::NotSupp => Some("MNT3ERR_NOTSUPP"),
            Self::ServerFault => Some("MNT3ERR_SERVERFAULT"),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for MountStat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{label}"),
            None => write!(f, "{}", self.to_u32()),
        }
    }
}

/// `fhandle3`: an opaque handle of up to FHSIZE3 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHandle {
    pub data: Vec<u8>,
}

impl FileHandle {
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

/// `mountres3_ok`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountInfo {
    pub fhandle: FileHandle,
    pub auth_flavors: Vec<u32>,
}

/// `mountres3`: the MNT procedure's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountRes3 {
    Ok(MountInfo),
    Err(MountStat),
}

impl MountRes3 {
    pub fn serialize_alloc(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::Ok(info) => {
                xdr::put_u32(&mut buf, 0);
                xdr::put_opaque(&mut buf, &info.fhandle.data);
                xdr::put_u32(&mut buf, info.auth_flavors.len() as u32);
                for flavor in info.auth_flavors.iter() {
                    xdr::put_u32(&mut buf, *flavor);
                }
            }
            Self::Err(stat) => xdr::put_u32(&mut buf, stat.to_u32()),
        };
        buf
    }

    pub fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        match MountStat::from_u32(xdr::get_u32(input)?) {
            MountStat::Ok => {
                let data = xdr::get_opaque(input, Some(FHSIZE3))?;
                let count = xdr::get_u32(input)? as usize;
                // Each flavor takes 4 bytes, so a count larger than that is garbage.
                if count > input.len() / 4 {
                    return Err(DeserializeError);
                }
                let mut auth_flavors = Vec::with_capacity(count);
                for _i in 0..count {
                    auth_flavors.push(xdr::get_u32(input)?);
                }
                Ok(Self::Ok(MountInfo {
                    fhandle: FileHandle { data },
                    auth_flavors,
                }))
            }
            stat => Ok(Self::Err(stat)),
        }
    }
}

/// The MNT procedure's argument.
pub fn dirpath_arg(path: &OsStr) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + path.len() + 3);
    xdr::put_string(&mut buf, path);
    buf
}

/// One `exportnode`: an exported directory and the groups allowed to mount it. An empty group list
/// means the export is open to everyone.
///
/// Names are raw bytes from the server, and only become text when displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportEntry {
    pub dir: OsString,
    pub groups: Vec<OsString>,
}

impl ExportEntry {
    pub fn new(dir: impl AsRef<OsStr>, groups: &[&str]) -> Self {
        Self {
            dir: dir.as_ref().to_os_string(),
            groups: groups.iter().map(OsString::from).collect(),
        }
    }
}

/// `exports`: on the wire this is a linked list of optional nodes, each holding a nested linked
/// list of groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exports {
    pub inner: Vec<ExportEntry>,
}

impl Exports {
    pub fn serialize_alloc(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for export in self.inner.iter() {
            xdr::put_bool(&mut buf, true);
            xdr::put_string(&mut buf, &export.dir);
            for group in export.groups.iter() {
                xdr::put_bool(&mut buf, true);
                xdr::put_string(&mut buf, group);
            }
            xdr::put_bool(&mut buf, false);
        }
        xdr::put_bool(&mut buf, false);
        buf
    }

    pub fn deserialize(input: &mut &[u8]) -> Result<Self, DeserializeError> {
        let mut inner = Vec::new();
        while xdr::get_bool(input)? {
            let dir = xdr::get_string(input, Some(MNTPATHLEN))?;
            let mut groups = Vec::new();
            while xdr::get_bool(input)? {
                groups.push(xdr::get_string(input, Some(MNTNAMLEN))?);
            }
            inner.push(ExportEntry { dir, groups });
        }
        Ok(Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_numeric() {
        assert_eq!(MountStat::from_u32(13).to_string(), "MNT3ERR_ACCES");
        assert_eq!(MountStat::from_u32(10006).to_string(), "MNT3ERR_SERVERFAULT");
        assert_eq!(MountStat::from_u32(9999), MountStat::Unknown(9999));
        assert_eq!(MountStat::Unknown(9999).to_string(), "9999");
    }

    #[test]
    fn mount_ok_reply() {
        // status 0, 4-byte handle, two flavors (AUTH_SYS, AUTH_NONE)
        let bytes = [
            0, 0, 0, 0, 0, 0, 0, 4, 0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 0,
        ];
        let res = MountRes3::deserialize(&mut bytes.as_slice()).unwrap();
        let MountRes3::Ok(info) = res else {
            panic!("expected MNT3_OK, got {res:?}");
        };
        assert_eq!(info.fhandle.to_hex(), "deadbeef");
        assert_eq!(info.auth_flavors, vec![1, 0]);
    }

    #[test]
    fn mount_error_reply() {
        let bytes = [0, 0, 0, 2];
        let res = MountRes3::deserialize(&mut bytes.as_slice()).unwrap();
        assert_eq!(res, MountRes3::Err(MountStat::NoEnt));
    }

    #[test]
    fn oversized_filehandle() {
        let res = MountRes3::Ok(MountInfo {
            fhandle: FileHandle { data: vec![1; 65] },
            auth_flavors: vec![],
        });
        let bytes = res.serialize_alloc();
        assert!(MountRes3::deserialize(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn exports_keep_server_order() {
        let exports = Exports {
            inner: vec![
                ExportEntry::new("/a", &[]),
                ExportEntry::new("/b", &["g1", "g2"]),
                ExportEntry::new("/srv/nfs/c", &["10.0.0.0/8"]),
            ],
        };
        let bytes = exports.serialize_alloc();
        let after = Exports::deserialize(&mut bytes.as_slice()).unwrap();
        assert_eq!(exports, after);
    }

    #[test]
    fn empty_export_list() {
        let after = Exports::deserialize(&mut [0u8, 0, 0, 0].as_slice()).unwrap();
        assert!(after.inner.is_empty());
    }

    #[test]
    fn truncated_export_list() {
        let mut bytes = Exports {
            inner: vec![ExportEntry::new("/a", &["g1"])],
        }
        .serialize_alloc();
        bytes.truncate(bytes.len() - 4);
        assert!(Exports::deserialize(&mut bytes.as_slice()).is_err());
    }

    #[test]
    fn dirpath_is_xdr_string() {
        assert_eq!(dirpath_arg(OsStr::new("/export")), b"\0\0\0\x07/export\0".to_vec());
    }

    #[test]
    fn export_names_are_not_reencoded() {
        use std::os::unix::ffi::OsStrExt;

        let dir = OsStr::from_bytes(b"/caf\xe9");
        let bytes = Exports {
            inner: vec![ExportEntry::new(dir, &[])],
        }
        .serialize_alloc();
        let after = Exports::deserialize(&mut bytes.as_slice()).unwrap();

        assert_eq!(after.inner[0].dir, dir);
        assert_eq!(dirpath_arg(&after.inner[0].dir), b"\0\0\0\x05/caf\xe9\0\0\0".to_vec());
    }
}
