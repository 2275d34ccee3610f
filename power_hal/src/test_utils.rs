// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Helpers shared by this crate's unit tests and its integration tests.
//!
//! Tests lay out a fake device under a temporary directory and point a `Sysfs` at it; the
//! helpers here take device paths such as `/dev/cpu_freq_max` and resolve them under that root.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::standby::StandbyTimer;

/// Where the device path `path` lives under the fake root `root`.
pub fn host_path(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

/// Creates the file at device path `path` with `content`, along with its parent directories.
pub fn touch(root: &Path, path: &str, content: &str) {
    let path = host_path(root, path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Replaces the file at device path `path` with a link to `/dev/full`, so every write fails
/// with ENOSPC.
pub fn make_full(root: &Path, path: &str) {
    let path = host_path(root, path);
    if path.exists() {
        fs::remove_file(&path).unwrap();
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::os::unix::fs::symlink("/dev/full", path).unwrap();
}

/// The values written to the control file at device path `path`, one per line.
pub fn read_lines(root: &Path, path: &str) -> Vec<String> {
    fs::read_to_string(host_path(root, path))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerCall {
    Set(Duration),
    Disable,
}

/// A `StandbyTimer` that records its calls. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingTimer {
    calls: Arc<Mutex<Vec<TimerCall>>>,
    /// Every call fails with EIO after being recorded.
    pub fail: bool,
}

impl RecordingTimer {
    pub fn failing() -> Self {
        RecordingTimer {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<TimerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: TimerCall) -> base::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            return Err(base::Error::new(libc::EIO));
        }
        Ok(())
    }
}

impl StandbyTimer for RecordingTimer {
    fn set_standby_timer(&mut self, timeout: Duration) -> base::Result<()> {
        self.record(TimerCall::Set(timeout))
    }

    fn disable_standby_timer(&mut self) -> base::Result<()> {
        self.record(TimerCall::Disable)
    }
}
