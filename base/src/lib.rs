// Copyright 2020 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Small, safe wrappers for the system interfaces the power HAL needs.

mod clock;
mod errno;
pub mod syslog;

mod sys;

pub use clock::Clock;
pub use clock::FakeClock;
pub use clock::SharedFakeClock;
pub use clock::TimeSource;
pub use errno::errno_result;
pub use errno::Error;
pub use errno::Result;
pub use log::debug;
pub use log::error;
pub use log::info;
pub use log::trace;
pub use log::warn;
