// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Facilities for sending log messages to the platform log.
//!
//! On Android, records go to logd (`logcat`) under the configured tag. Everywhere else they are
//! formatted by `env_logger` and written to stderr, or to the pipe given in `LogConfig`.
//!
//! # Examples
//!
//! ```
//! use base::syslog;
//! use base::syslog::LogConfig;
//! use log::{error, warn};
//!
//! if let Err(e) = syslog::init_with(LogConfig::default()) {
//!     println!("failed to initialize syslog: {}", e);
//!     return;
//! }
//! warn!("this is your {} warning", "final");
//! error!("something went horribly wrong: {}", "out of RAMs");
//! ```

use std::io::Write;

use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;
use remain::sorted;
use thiserror::Error as ThisError;

use crate::sys::platform::PlatformLogger;

/// Default log tag, matching the name the service registers under.
pub const DEFAULT_PROC_NAME: &str = "android.hardware.power-service.tegra";

/// Errors returned by `syslog::init_with()`.
#[sorted]
#[derive(ThisError, Debug)]
pub enum Error {
    /// A global logger has already been installed in this process.
    #[error("a logger is already installed")]
    AlreadyInitialized,
    /// The process name cannot be used as a log tag.
    #[error("invalid log tag {0:?}")]
    InvalidTag(String),
}

/// Configuration of the process logger.
pub struct LogConfig {
    /// Filter specification in `env_logger` syntax, e.g. `info` or `power_hal=debug,warn`.
    pub log_level: String,
    /// Echo records to stderr when no pipe is configured.
    pub stderr: bool,
    /// Write records here instead of stderr. Ignored on Android.
    pub pipe: Option<Box<dyn Write + Send>>,
    /// Tag/process name prefixed to each record.
    pub proc_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            log_level: "info".to_string(),
            stderr: true,
            pipe: None,
            proc_name: DEFAULT_PROC_NAME.to_string(),
        }
    }
}

/// The installed logger: a level filter in front of the platform sink.
pub struct State {
    filter: env_logger::filter::Filter,
    sink: PlatformLogger,
}

impl State {
    pub fn new(cfg: LogConfig) -> Result<State, Error> {
        if cfg.proc_name.is_empty() || cfg.proc_name.contains('\0') {
            return Err(Error::InvalidTag(cfg.proc_name));
        }
        let filter = env_logger::filter::Builder::new()
            .parse(&cfg.log_level)
            .build();
        Ok(State {
            filter,
            sink: PlatformLogger::new(cfg),
        })
    }

    /// The most verbose level any record can pass this logger with.
    pub fn max_level(&self) -> LevelFilter {
        self.filter.filter()
    }
}

impl Log for State {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.filter.matches(record) {
            self.sink.log(record);
        }
    }

    fn flush(&self) {
        self.sink.flush();
    }
}

/// Installs the process-wide logger.
///
/// Should be called once, early in `main`. Every call after the first successful one returns
/// `Error::AlreadyInitialized` and leaves the original logger in place.
pub fn init_with(cfg: LogConfig) -> Result<(), Error> {
    let state = State::new(cfg)?;
    let max_level = state.max_level();
    log::set_boxed_logger(Box::new(state)).map_err(|_| Error::AlreadyInitialized)?;
    log::set_max_level(max_level);
    Ok(())
}

/// Flushes records the installed logger may still be holding.
pub fn flush() {
    log::logger().flush();
}
