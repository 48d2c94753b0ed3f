// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use log::*;

use crate::config::Config;
use crate::query::{list_exports, lookup_filehandle};
use crate::report::{Event, Reporter, Tally};
use crate::session::{Connector, MountClient};
use crate::target::Target;

/// Drives the target list through the queries, one target at a time and in order.
pub struct QueryLoop<C, R> {
    config: Config,
    targets: Vec<Target>,
    connector: C,
    reporter: R,
    tally: Tally,
}

impl<C: Connector, R: Reporter> QueryLoop<C, R> {
    pub fn new(config: Config, targets: Vec<Target>, connector: C, reporter: R) -> Self {
        Self {
            config,
            targets,
            connector,
            reporter,
            tally: Tally::default(),
        }
    }

    /// Run one pass, or pass after pass forever in loop mode. Returns the totals.
    pub fn run(&mut self) -> Tally {
        loop {
            self.run_pass();
            if !self.config.loop_forever {
                break;
            }
        }
        self.tally
    }

    /// Query every target once, with a fresh connection to each.
    pub fn run_pass(&mut self) {
        for target in self.targets.iter() {
            if self.config.verbose {
                self.reporter.report(Event::Connecting {
                    host: target.name.clone(),
                    addr: target.addr,
                });
            }

            let mut client = match self.connector.connect(target, &self.config) {
                Ok(client) => client,
                Err(e) => {
                    self.reporter.report(Event::ConnectFailed {
                        host: target.name.clone(),
                        addr: target.addr,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            query_target(
                &mut client,
                target,
                &self.config,
                &mut self.reporter,
                &mut self.tally,
            );
        }
        debug!(
            "pass complete: {} attempted, {} ok",
            self.tally.attempted, self.tally.ok
        );
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }
}

fn query_target<M: MountClient>(
    client: &mut M,
    target: &Target,
    config: &Config,
    reporter: &mut dyn Reporter,
    tally: &mut Tally,
) {
    let path = target.path.as_deref().filter(|_| !config.show_exports);
    if let Some(path) = path {
        let result = lookup_filehandle(client, &target.name, path, config, reporter);
        tally.record(target, result, reporter);
        return;
    }

    let entries = match list_exports(client) {
        Ok(entries) => entries,
        Err(e) => {
            tally.record_enumeration_failure();
            reporter.report(Event::ExportsFailed {
                host: target.name.clone(),
                error: e.to_string(),
            });
            return;
        }
    };

    if config.show_exports {
        tally.record_listing(entries.len());
        reporter.report(Event::Exports {
            host: target.name.clone(),
            entries,
        });
    } else {
        for entry in entries {
            let result = lookup_filehandle(client, &target.name, &entry.dir, config, reporter);
            tally.record(target, result, reporter);
        }
    }
}
