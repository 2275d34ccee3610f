// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use base::warn;

use crate::config::ClusterConfig;
use crate::hint::HintData;
use crate::hint::PowerHint;
use crate::sysfs::ControlNode;
use crate::sysfs::Sysfs;

/// Which of a cluster's constraint handles to act on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FreqKnob {
    Min,
    Max,
    VsyncMin,
}

/// A CPU frequency domain and the constraint handles the HAL holds on it.
pub struct CpuCluster {
    pub name: String,
    pub available_freqs_path: PathBuf,
    /// Supported frequency steps in kHz, ascending. Empty if the list could not be read.
    pub available_frequencies: Vec<i32>,
    pub app_min_freq: Option<ControlNode>,
    pub app_max_freq: Option<ControlNode>,
    pub vsync_min_freq: Option<ControlNode>,
    pub hints: BTreeMap<PowerHint, HintData>,
}

impl CpuCluster {
    pub fn open(sysfs: &Sysfs, cfg: &ClusterConfig) -> Self {
        let mut available_frequencies = match sysfs.read_ints(&cfg.available_freqs_path) {
            Ok(freqs) => freqs,
            Err(e) => {
                warn!("cluster {}: {}, frequencies will not be clamped", cfg.name, e);
                Vec::new()
            }
        };
        available_frequencies.sort_unstable();
        available_frequencies.dedup();

        let open = |path: &Option<PathBuf>| path.as_ref().and_then(|p| sysfs.open_if_present(p));
        CpuCluster {
            name: cfg.name.clone(),
            available_freqs_path: cfg.available_freqs_path.clone(),
            available_frequencies,
            app_min_freq: open(&cfg.min_freq_path),
            app_max_freq: open(&cfg.max_freq_path),
            vsync_min_freq: open(&cfg.vsync_min_freq_path),
            hints: cfg.hints.clone(),
        }
    }

    pub fn node_mut(&mut self, knob: FreqKnob) -> Option<&mut ControlNode> {
        match knob {
            FreqKnob::Min => self.app_min_freq.as_mut(),
            FreqKnob::Max => self.app_max_freq.as_mut(),
            FreqKnob::VsyncMin => self.vsync_min_freq.as_mut(),
        }
    }

    /// The lowest supported step at or above `khz`, capped at the top step.
    pub fn floor_freq(&self, khz: i32) -> i32 {
        match self.available_frequencies.last() {
            None => khz,
            Some(&top) => self
                .available_frequencies
                .iter()
                .copied()
                .find(|&f| f >= khz)
                .unwrap_or(top),
        }
    }

    /// The highest supported step at or below `khz`, never below the bottom step.
    pub fn ceiling_freq(&self, khz: i32) -> i32 {
        match self.available_frequencies.first() {
            None => khz,
            Some(&bottom) => self
                .available_frequencies
                .iter()
                .copied()
                .rev()
                .find(|&f| f <= khz)
                .unwrap_or(bottom),
        }
    }
}
