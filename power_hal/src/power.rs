// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use base::error;
use base::info;

use crate::aidl::Boost;
use crate::aidl::ExceptionCode;
use crate::aidl::IPower;
use crate::aidl::Mode;
use crate::aidl::PowerHintSession;
use crate::aidl::Result;
use crate::aidl::Status;
use crate::dispatcher::HintDispatcher;
use crate::hint::HintPayload;
use crate::hint::PowerHint;
use crate::standby::StandbyTimer;
use crate::standby::HDD_STANDBY_TIMEOUT;

struct Inner {
    dispatcher: HintDispatcher,
    standby: Box<dyn StandbyTimer>,
}

/// The power HAL service.
pub struct Power {
    inner: Mutex<Inner>,
    sata_standby: bool,
}

impl Power {
    pub fn new(dispatcher: HintDispatcher, standby: Box<dyn StandbyTimer>) -> Self {
        let sata_standby = dispatcher.info().features.sata_standby;
        Power {
            inner: Mutex::new(Inner {
                dispatcher,
                standby,
            }),
            sata_standby,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, hint: PowerHint, enabled: bool) {
        self.lock().dispatcher.dispatch(hint, HintPayload::from(enabled));
    }

    /// Display on/off. Also runs the disk standby timer while the display is off on boards
    /// with a SATA disk.
    pub fn set_interactive(&self, interactive: bool) {
        let mut inner = self.lock();
        inner.dispatcher.set_interactive(interactive);

        if !self.sata_standby {
            return;
        }
        info!(
            "display is {}, {} disk standby",
            if interactive { "on" } else { "off" },
            if interactive { "disabling" } else { "entering" }
        );
        let result = if interactive {
            inner.standby.disable_standby_timer()
        } else {
            inner.standby.set_standby_timer(HDD_STANDBY_TIMEOUT)
        };
        if let Err(e) = result {
            error!("failed to set standby timer, error: {}", e.errno());
        }
    }
}

#[allow(non_snake_case)]
impl IPower for Power {
    fn setMode(&self, mode: Mode, enabled: bool) -> Result<()> {
        info!("Power setMode: {:?} to: {}", mode, enabled);
        match mode {
            Mode::LowPower => self.dispatch(PowerHint::LowPower, enabled),
            Mode::AudioStreamingLowLatency => self.dispatch(PowerHint::AudioLowLatency, enabled),
            Mode::Launch => self.dispatch(PowerHint::Launch, enabled),
            Mode::Interactive => self.set_interactive(enabled),
            _ => info!("Mode {:?} Not Supported", mode),
        }
        Ok(())
    }

    fn isModeSupported(&self, mode: Mode) -> Result<bool> {
        let supported = matches!(
            mode,
            Mode::LowPower | Mode::AudioStreamingLowLatency | Mode::Launch | Mode::Interactive
        );
        info!("Power isModeSupported: {:?} {}", mode, supported);
        Ok(supported)
    }

    fn setBoost(&self, boost: Boost, durationMs: i32) -> Result<()> {
        info!("Power setBoost: {:?} duration: {}", boost, durationMs);
        Err(Status::new_exception(ExceptionCode::UNSUPPORTED_OPERATION, None))
    }

    fn isBoostSupported(&self, boost: Boost) -> Result<bool> {
        info!("Power isBoostSupported: {:?}", boost);
        Ok(false)
    }

    fn createHintSession(
        &self,
        _tgid: i32,
        _uid: i32,
        _threadIds: &[i32],
        _durationNanos: i64,
    ) -> Result<PowerHintSession> {
        Err(Status::new_exception(ExceptionCode::UNSUPPORTED_OPERATION, None))
    }

    fn getHintSessionPreferredRate(&self) -> Result<i64> {
        Err(Status::new_exception(ExceptionCode::UNSUPPORTED_OPERATION, None))
    }
}
