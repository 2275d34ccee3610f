// Copyright 2020 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Log sink wrapping Android's logging library, liblog.

use std::ffi::CString;

use android_log_sys::LogPriority;
use log::Level;
use log::Record;

use crate::syslog::LogConfig;

pub(crate) struct PlatformLogger {
    tag: CString,
}

impl PlatformLogger {
    pub(crate) fn new(cfg: LogConfig) -> Self {
        // The tag was checked for interior NULs by `State::new`.
        let tag = CString::new(cfg.proc_name).unwrap_or_default();
        PlatformLogger { tag }
    }

    pub(crate) fn log(&self, record: &Record) {
        let priority = match record.level() {
            Level::Error => LogPriority::ERROR,
            Level::Warn => LogPriority::WARN,
            Level::Info => LogPriority::INFO,
            Level::Debug => LogPriority::DEBUG,
            Level::Trace => LogPriority::VERBOSE,
        };
        let message = match (record.file(), record.line()) {
            (Some(file), Some(line)) => format!("[{}:{}] {}", file, line, record.args()),
            _ => record.args().to_string(),
        };
        // Messages with interior NULs cannot be handed to liblog; drop them.
        let message = match CString::new(message) {
            Ok(m) => m,
            Err(_) => return,
        };
        // SAFETY: both pointers come from live CStrings that outlive the call.
        unsafe {
            android_log_sys::__android_log_write(
                priority as i32,
                self.tag.as_ptr(),
                message.as_ptr(),
            );
        }
    }

    pub(crate) fn flush(&self) {}
}
