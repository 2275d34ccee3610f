// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The framework-facing power HAL contract: the `IPower` operations, their `Mode` and `Boost`
//! arguments and the exception codes they fail with.

#![allow(non_snake_case)]

use std::fmt;
use std::fmt::Display;

use enumn::N;
use serde::Deserialize;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Mode {
    DoubleTapToWake = 0,
    LowPower = 1,
    SustainedPerformance = 2,
    FixedPerformance = 3,
    Vr = 4,
    Launch = 5,
    ExpensiveRendering = 6,
    Interactive = 7,
    DeviceIdle = 8,
    DisplayInactive = 9,
    AudioStreamingLowLatency = 10,
    CameraStreamingSecure = 11,
    CameraStreamingLow = 12,
    CameraStreamingMid = 13,
    CameraStreamingHigh = 14,
    Game = 15,
    GameLoading = 16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Boost {
    Interaction = 0,
    DisplayUpdateImminent = 1,
    MlAcc = 2,
    AudioLaunch = 3,
    CameraLaunch = 4,
    CameraShot = 5,
}

/// Binder exception code carried by a failed call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCode(pub i32);

impl ExceptionCode {
    pub const NONE: ExceptionCode = ExceptionCode(0);
    pub const ILLEGAL_ARGUMENT: ExceptionCode = ExceptionCode(-3);
    pub const ILLEGAL_STATE: ExceptionCode = ExceptionCode(-5);
    pub const UNSUPPORTED_OPERATION: ExceptionCode = ExceptionCode(-7);
}

impl Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ExceptionCode::NONE => "NONE",
            ExceptionCode::ILLEGAL_ARGUMENT => "ILLEGAL_ARGUMENT",
            ExceptionCode::ILLEGAL_STATE => "ILLEGAL_STATE",
            ExceptionCode::UNSUPPORTED_OPERATION => "UNSUPPORTED_OPERATION",
            _ => return write!(f, "exception {}", self.0),
        };
        write!(f, "{}", name)
    }
}

/// Failure of an `IPower` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    exception: ExceptionCode,
    message: Option<String>,
}

impl Status {
    pub fn new_exception(exception: ExceptionCode, message: Option<&str>) -> Self {
        Status {
            exception,
            message: message.map(str::to_string),
        }
    }

    pub fn exception_code(&self) -> ExceptionCode {
        self.exception
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.exception, message),
            None => write!(f, "{}", self.exception),
        }
    }
}

impl std::error::Error for Status {}

pub type Result<T> = std::result::Result<T, Status>;

/// A hint session. This HAL never creates one.
#[derive(Debug)]
pub enum PowerHintSession {}

/// Operations the framework calls on the power HAL.
pub trait IPower: Send + Sync {
    fn setMode(&self, mode: Mode, enabled: bool) -> Result<()>;
    fn isModeSupported(&self, mode: Mode) -> Result<bool>;
    fn setBoost(&self, boost: Boost, durationMs: i32) -> Result<()>;
    fn isBoostSupported(&self, boost: Boost) -> Result<bool>;
    fn createHintSession(
        &self,
        tgid: i32,
        uid: i32,
        threadIds: &[i32],
        durationNanos: i64,
    ) -> Result<PowerHintSession>;
    fn getHintSessionPreferredRate(&self) -> Result<i64>;
}
