// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Building the target list from `host[:path]` arguments.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::str::FromStr;

use log::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("invalid target '{0}': expected host[:path]")]
    Invalid(String),

    #[error("{host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}: no IPv4 address found")]
    NoAddress(String),
}

/// A target as given on the command line, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub host: String,
    pub path: Option<String>,
}

impl FromStr for TargetSpec {
    type Err = TargetError;

    /// Everything up to the first `:` is the host, and the rest (if not empty) is the path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, path) = match s.split_once(':') {
            Some((host, path)) => (host, Some(path).filter(|p| !p.is_empty())),
            None => (s, None),
        };
        if host.is_empty() {
            return Err(TargetError::Invalid(s.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            path: path.map(str::to_string),
        })
    }
}

/// One server endpoint to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The host as the user named it.
    pub name: String,
    pub addr: Ipv4Addr,
    /// `None` means enumerate the server's exports.
    pub path: Option<String>,
}

impl Target {
    pub fn new(name: &str, addr: Ipv4Addr, path: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            addr,
            path: path.map(str::to_string),
        }
    }
}

/// Resolve every spec, in order. With `multiple`, a name with several IPv4 addresses becomes one
/// target per address; otherwise only the first address is used.
pub fn make_targets(specs: &[TargetSpec], multiple: bool) -> Result<Vec<Target>, TargetError> {
    let mut targets = Vec::with_capacity(specs.len());
    for spec in specs {
        let addrs = resolve(&spec.host)?;
        targets.extend(targets_for(spec, addrs, multiple));
    }
    Ok(targets)
}

fn targets_for(spec: &TargetSpec, addrs: Vec<Ipv4Addr>, multiple: bool) -> Vec<Target> {
    let take = if multiple { addrs.len() } else { 1 };
    addrs
        .into_iter()
        .take(take)
        .map(|addr| Target::new(&spec.host, addr, spec.path.as_deref()))
        .collect()
}

fn resolve(host: &str) -> Result<Vec<Ipv4Addr>, TargetError> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(vec![addr]);
    }

    let resolved = (host, 0)
        .to_socket_addrs()
        .map_err(|source| TargetError::Resolve {
            host: host.to_string(),
            source,
        })?;

    let addrs = ipv4_only(resolved.map(|addr| addr.ip()));
    debug!("{host} resolves to {addrs:?}");

    if addrs.is_empty() {
        return Err(TargetError::NoAddress(host.to_string()));
    }
    Ok(addrs)
}

/// The IPv4 addresses among `addrs`, first occurrence of each, in order.
fn ipv4_only<I: IntoIterator<Item = IpAddr>>(addrs: I) -> Vec<Ipv4Addr> {
    let mut v4s = Vec::new();
    for addr in addrs {
        if let IpAddr::V4(v4) = addr {
            // getaddrinfo can hand back the same address once per socket type.
            if !v4s.contains(&v4) {
                v4s.push(v4);
            }
        }
    }
    v4s
}
