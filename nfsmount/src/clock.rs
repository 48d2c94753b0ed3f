// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Timestamps for call timing. Elapsed time comes from the raw monotonic clock where the platform
//! has one, so NTP slewing doesn't skew latency measurements.

use std::time::Duration;

use nix::time::{clock_gettime, ClockId};

#[cfg(any(target_os = "linux", target_os = "android"))]
const MONOTONIC: ClockId = ClockId::CLOCK_MONOTONIC_RAW;

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const MONOTONIC: ClockId = ClockId::CLOCK_MONOTONIC;

/// A reading of the monotonic clock, only meaningful relative to another reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Monotonic(Duration);

impl Monotonic {
    pub fn now() -> Self {
        // clock_gettime only fails for clock ids the kernel doesn't know about.
        Self(clock_gettime(MONOTONIC).map(Duration::from).unwrap_or_default())
    }

    /// Time from `earlier` to `self`, never negative.
    pub fn since(self, earlier: Monotonic) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

/// Wall clock seconds since the epoch, for lining results up with other logs.
pub fn wall_clock_secs() -> u64 {
    clock_gettime(ClockId::CLOCK_REALTIME)
        .map(|ts| ts.tv_sec().max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_moves_forward() {
        let start = Monotonic::now();
        std::thread::sleep(Duration::from_millis(2));
        let end = Monotonic::now();
        assert!(end.since(start) >= Duration::from_millis(1));
        assert_eq!(start.since(end), Duration::ZERO);
    }

    #[test]
    fn wall_clock_is_after_2020() {
        assert!(wall_clock_secs() > 1_577_836_800);
    }
}
