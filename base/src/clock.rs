// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Clock objects handing out the current time, plus a fake clock that tests can step by hand.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Anything that can report a monotonic "now".
pub trait TimeSource: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Clock {}
impl Clock {
    pub fn new() -> Self {
        Clock {}
    }

    pub fn now(&self) -> Instant {
        Instant::now()
    }
}

impl TimeSource for Clock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A fake clock that can be used in tests to give exact control over the time.
#[derive(Debug)]
pub struct FakeClock {
    epoch: Instant,
    ns_since_epoch: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            epoch: Instant::now(),
            ns_since_epoch: 0,
        }
    }

    /// Get the current time, according to this clock.
    pub fn now(&self) -> Instant {
        self.epoch + Duration::from_nanos(self.ns_since_epoch)
    }

    ///  Get the current time in ns, according to this clock.
    pub fn nanos(&self) -> u64 {
        self.ns_since_epoch
    }

    pub fn add_ns(&mut self, ns: u64) {
        self.ns_since_epoch += ns;
    }

    pub fn add(&mut self, duration: Duration) {
        self.add_ns(duration.as_nanos() as u64);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

/// A `FakeClock` that the test keeps a handle to while the code under test reads it.
pub type SharedFakeClock = Arc<Mutex<FakeClock>>;

impl TimeSource for SharedFakeClock {
    fn now(&self) -> Instant {
        self.lock().unwrap_or_else(PoisonError::into_inner).now()
    }
}
