// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Disk spin-down timer.

use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use base::errno_result;
use base::Error;
use base::Result;

/// How long the disk may sit idle before spinning down while the display is off.
pub const HDD_STANDBY_TIMEOUT: Duration = Duration::from_secs(60);

const HDIO_DRIVE_CMD: libc::c_ulong = 0x031f;
const ATA_OP_SETIDLE: u8 = 0xe3;

/// Controls the idle timer of a storage device.
pub trait StandbyTimer: Send {
    fn set_standby_timer(&mut self, timeout: Duration) -> Result<()>;
    fn disable_standby_timer(&mut self) -> Result<()>;
}

/// Standby timer of an ATA disk, set with the IDLE command.
pub struct AtaStandbyTimer {
    device: PathBuf,
}

impl AtaStandbyTimer {
    pub fn new<P: Into<PathBuf>>(device: P) -> Self {
        AtaStandbyTimer {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn set_idle(&self, value: u8) -> Result<()> {
        let disk = OpenOptions::new()
            .read(true)
            .open(&self.device)
            .map_err(Error::from)?;
        let mut args: [u8; 4] = [ATA_OP_SETIDLE, value, 0, 0];
        // SAFETY: `disk` is an open block device and HDIO_DRIVE_CMD reads and writes at most the
        // four bytes of `args`, which outlive the call.
        let ret = unsafe { libc::ioctl(disk.as_raw_fd(), HDIO_DRIVE_CMD as _, args.as_mut_ptr()) };
        if ret < 0 {
            return errno_result();
        }
        Ok(())
    }
}

impl StandbyTimer for AtaStandbyTimer {
    fn set_standby_timer(&mut self, timeout: Duration) -> Result<()> {
        self.set_idle(standby_value(timeout))
    }

    fn disable_standby_timer(&mut self) -> Result<()> {
        self.set_idle(0)
    }
}

/// Encodes `timeout` as the ATA standby count: units of 5 s up to 20 minutes, then units of
/// 30 minutes up to 5.5 hours. Zero disables the timer, so anything shorter becomes 5 s.
pub fn standby_value(timeout: Duration) -> u8 {
    let secs = timeout.as_secs();
    if secs <= 240 * 5 {
        (secs.div_ceil(5)).clamp(1, 240) as u8
    } else {
        let half_hours = secs.div_ceil(30 * 60).min(11);
        (240 + half_hours) as u8
    }
}
