// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Query NFS servers' MOUNT service for root filehandles or export lists, timing each call.

pub mod clock;
pub mod config;
pub mod mount_proto;
pub mod query;
pub mod report;
pub mod run;
pub mod session;
pub mod target;

pub use config::Config;
pub use run::QueryLoop;
