// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Power HAL for Tegra devices.
//!
//! Framework power modes arrive through [`IPower`] and end up as writes to the kernel's
//! frequency and CPU count constraint files, input device toggles and the disk standby timer.

pub mod aidl;
pub mod cluster;
pub mod config;
pub mod dispatcher;
pub mod hint;
pub mod info;
pub mod power;
pub mod property;
pub mod standby;
pub mod sysfs;
pub mod test_utils;
pub mod timing;

pub use aidl::IPower;
pub use config::DeviceConfig;
pub use dispatcher::HintDispatcher;
pub use hint::HintPayload;
pub use hint::PowerHint;
pub use info::PowerHalInfo;
pub use power::Power;
pub use standby::AtaStandbyTimer;
pub use standby::StandbyTimer;
pub use sysfs::Sysfs;
pub use timing::HintTimer;
