// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::Ipv4Addr;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::*;

use nfsmount::report::ConsoleReporter;
use nfsmount::session::RpcConnector;
use nfsmount::target::{make_targets, TargetSpec};
use nfsmount::{Config, QueryLoop};
use rpc_protocol::client::Transport;

/// Get root filehandles from NFS servers, timing each MOUNT call.
#[derive(Parser, Debug)]
#[command(name = "nfsmount", version)]
struct Cli {
    /// Print exports (like showmount -e)
    #[arg(short = 'e')]
    exports: bool,

    /// Loop forever
    #[arg(short = 'l')]
    loop_forever: bool,

    /// Use multiple target IP addresses if found
    #[arg(short = 'm')]
    multiple: bool,

    /// Set source address
    #[arg(short = 'S', value_name = "ADDR")]
    source: Option<Ipv4Addr>,

    /// Use TCP (default UDP)
    #[arg(short = 'T')]
    tcp: bool,

    /// Verbose output
    #[arg(short = 'v')]
    verbose: bool,

    #[arg(value_name = "HOST[:MOUNTPOINT]", required = true)]
    targets: Vec<TargetSpec>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            show_exports: self.exports,
            loop_forever: self.loop_forever,
            multiple: self.multiple,
            transport: if self.tcp { Transport::Tcp } else { Transport::Udp },
            verbose: self.verbose,
            source: self.source,
            privileged: nix::unistd::geteuid().is_root(),
            ..Config::default()
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("nfsmount: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Cli) -> anyhow::Result<bool> {
    let config = args.config();
    debug!("{config:?}");

    let targets = make_targets(&args.targets, config.multiple).context("resolving targets")?;

    let mut query_loop = QueryLoop::new(config, targets, RpcConnector, ConsoleReporter::stdio());
    let tally = query_loop.run();
    debug!("{} attempted, {} ok", tally.attempted, tally.ok);

    Ok(tally.success())
}
