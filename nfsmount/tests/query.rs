// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

mod common;

use common::*;

use nfsmount::mount_proto::*;
use nfsmount::query::*;
use nfsmount::report::Event;
use nfsmount::Config;

#[test]
fn malformed_paths_never_reach_the_server() {
    let config = Config::default();
    for path in ["", "export", "relative/path", "./x", " /leading-space"] {
        let mut client = FakeClient::new(FakeServer::default());
        let mut reporter = Collect::default();

        let res = lookup_filehandle(&mut client, "host1", path, &config, &mut reporter);

        assert!(matches!(res.status, Status::InvalidPath), "{path:?}");
        assert_eq!(res.path, path);
        assert!(res.filehandle().is_none());
        assert!(res.elapsed.is_none());
        assert_eq!(client.calls(), 0, "{path:?} was sent to the server");
        assert!(reporter.events.is_empty());
    }
}

#[test]
fn successful_lookup_has_filehandle() {
    let server =
        FakeServer::default().with_mount("/export", MntReply::Handle(vec![0xde, 0xad, 0xbe, 0xef]));
    let mut client = FakeClient::new(server);
    let mut reporter = Collect::default();

    let res = lookup_filehandle(&mut client, "host1", "/export", &Config::default(), &mut reporter);

    assert!(res.is_ok());
    assert_eq!(res.filehandle().map(FileHandle::to_hex).as_deref(), Some("deadbeef"));
    assert!(res.elapsed.is_some());
    assert!(res.timestamp > 0);
    assert_eq!(client.calls(), 1);
}

#[test]
fn protocol_errors_have_no_filehandle() {
    for stat in [
        MountStat::NoEnt,
        MountStat::NotDir,
        MountStat::ServerFault,
        MountStat::Unknown(4242),
    ] {
        let server = FakeServer::default().with_mount("/export", MntReply::Status(stat));
        let mut client = FakeClient::new(server);
        let mut reporter = Collect::default();

        let res =
            lookup_filehandle(&mut client, "host1", "/export", &Config::default(), &mut reporter);

        assert!(!res.is_ok());
        assert!(res.filehandle().is_none());
        // The server did answer, so the round trip was timed.
        assert!(res.elapsed.is_some());
        assert!(matches!(res.status, Status::ProtocolError(s) if s == stat));
    }
}

#[test]
fn transport_error_has_no_timing() {
    let server = FakeServer::default().with_mount("/export", MntReply::NoReply);
    let mut client = FakeClient::new(server);
    let mut reporter = Collect::default();

    let res = lookup_filehandle(&mut client, "host1", "/export", &Config::default(), &mut reporter);

    let Status::TransportError(ref e) = res.status else {
        panic!("expected a transport error, got {res:?}");
    };
    assert_eq!(e.to_string(), "RPC: Timed out");
    assert!(res.elapsed.is_none());
    assert!(res.filehandle().is_none());
    assert_eq!(client.calls(), 1);
}

#[test]
fn access_denied_hint_when_unprivileged() {
    let server = FakeServer::default().with_mount("/export", MntReply::Status(MountStat::Acces));
    let mut client = FakeClient::new(server);
    let mut reporter = Collect::default();

    let res = lookup_filehandle(&mut client, "host1", "/export", &Config::default(), &mut reporter);

    assert!(matches!(res.status, Status::ProtocolError(MountStat::Acces)));
    assert_eq!(
        reporter.events,
        vec![Event::PrivilegedPortHint {
            host: "host1".to_string(),
            path: "/export".to_string(),
        }]
    );
}

#[test]
fn no_access_denied_hint_when_privileged() {
    let server = FakeServer::default().with_mount("/export", MntReply::Status(MountStat::Acces));
    let mut client = FakeClient::new(server);
    let mut reporter = Collect::default();
    let config = Config {
        privileged: true,
        ..Config::default()
    };

    let res = lookup_filehandle(&mut client, "host1", "/export", &config, &mut reporter);

    assert!(matches!(res.status, Status::ProtocolError(MountStat::Acces)));
    assert!(reporter.events.is_empty());
}

#[test]
fn export_failure_is_not_an_empty_list() {
    let mut silent = FakeClient::new(FakeServer::default());
    assert!(list_exports(&mut silent).is_err());

    let mut empty = FakeClient::new(FakeServer::default().with_exports(vec![]));
    assert!(list_exports(&mut empty).unwrap().is_empty());
}
