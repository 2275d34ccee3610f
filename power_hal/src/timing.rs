// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::collections::BTreeMap;
use std::time::Duration;
use std::time::Instant;

use base::TimeSource;

use crate::hint::PowerHint;

#[derive(Copy, Clone, Debug, Default)]
struct HintTiming {
    last_issued: Option<Instant>,
    min_interval: Duration,
}

/// Per-hint rate limiting.
///
/// A hint may be issued again once `min_interval` has passed since it was last issued.
/// Suppressed attempts do not move the window.
pub struct HintTimer {
    clock: Box<dyn TimeSource>,
    timings: BTreeMap<PowerHint, HintTiming>,
}

impl HintTimer {
    pub fn new<I>(clock: Box<dyn TimeSource>, intervals: I) -> Self
    where
        I: IntoIterator<Item = (PowerHint, Duration)>,
    {
        let timings = intervals
            .into_iter()
            .map(|(hint, min_interval)| {
                (
                    hint,
                    HintTiming {
                        last_issued: None,
                        min_interval,
                    },
                )
            })
            .collect();
        HintTimer { clock, timings }
    }

    pub fn min_interval(&self, hint: PowerHint) -> Duration {
        self.timings
            .get(&hint)
            .map(|t| t.min_interval)
            .unwrap_or_default()
    }

    pub fn last_issued(&self, hint: PowerHint) -> Option<Instant> {
        self.timings.get(&hint).and_then(|t| t.last_issued)
    }

    /// Records an issue of `hint` now, unless it was issued within its interval.
    ///
    /// Returns false if the hint should be suppressed.
    pub fn try_issue(&mut self, hint: PowerHint) -> bool {
        let now = self.clock.now();
        let timing = self.timings.entry(hint).or_default();
        if let Some(last) = timing.last_issued {
            if now < last + timing.min_interval {
                return false;
            }
        }
        timing.last_issued = Some(now);
        true
    }
}
