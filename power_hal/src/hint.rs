// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::fmt::Display;

use enumn::N;
use serde::Deserialize;
use serde::Serialize;

/// Vendor power hints, numbered as the vendor HAL numbers them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, N, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum PowerHint {
    Vsync = 1,
    Interaction = 2,
    VideoEncode = 3,
    VideoDecode = 4,
    LowPower = 5,
    SustainedPerformance = 6,
    VrMode = 7,
    Launch = 8,
    AppProfile = 9,
    AppLaunch = 10,
    ShieldStreaming = 11,
    HighResVideo = 12,
    PowerMode = 13,
    Miracast = 14,
    DisplayRotation = 15,
    Camera = 16,
    MultithreadBoost = 17,
    AudioSpeaker = 18,
    AudioOther = 19,
    AudioLowLatency = 20,
    CancelPhsHint = 21,
    FrameworksUi = 22,
    SfBql = 23,
    FramerateData = 24,
}

impl Display for PowerHint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self, *self as i32)
    }
}

/// Data accompanying a hint.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HintPayload {
    None,
    Enabled(bool),
    Value(i32),
}

impl HintPayload {
    /// Whether this payload asks to lift a previously applied constraint.
    pub fn is_release(self) -> bool {
        matches!(self, HintPayload::Enabled(false))
    }
}

impl From<bool> for HintPayload {
    fn from(enabled: bool) -> Self {
        HintPayload::Enabled(enabled)
    }
}

/// Bounds a hint applies to one group of knobs. Zero means "leave this bound alone".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintData {
    pub min: i32,
    pub max: i32,
    pub time_ms: i32,
}

impl HintData {
    pub fn new(min: i32, max: i32, time_ms: i32) -> Self {
        HintData { min, max, time_ms }
    }
}
