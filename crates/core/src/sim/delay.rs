// PassGate - Password-Gated GPIO Authorization
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use embedded_hal::delay::DelayNs;
use std::time::Duration;

/// Delay that accounts simulated time and, optionally, really sleeps.
#[derive(Debug, Default, Clone)]
pub struct SimDelay {
    elapsed_ns: u64,
    calls: u64,
    realtime: bool,
}

impl SimDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ns_wide(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns_wide(u64::from(ms) * 1_000_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_ns_wide(u64::from(us) * 1_000);
    }
}

impl SimDelay {
    // One call per request, however long, so `calls` counts requests.
    fn delay_ns_wide(&mut self, ns: u64) {
        self.elapsed_ns += ns;
        self.calls += 1;
        if self.realtime {
            std::thread::sleep(Duration::from_nanos(ns));
        }
    }
}
