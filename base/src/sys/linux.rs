// Copyright 2020 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Log sink for hosts without logd: records are formatted by `env_logger`.

use std::io::Write;

use log::Log;
use log::Record;

use crate::syslog::LogConfig;

pub(crate) struct PlatformLogger {
    logger: Option<env_logger::Logger>,
}

impl PlatformLogger {
    pub(crate) fn new(cfg: LogConfig) -> Self {
        let target = match cfg.pipe {
            Some(pipe) => env_logger::Target::Pipe(pipe),
            None if cfg.stderr => env_logger::Target::Stderr,
            None => return PlatformLogger { logger: None },
        };

        let proc_name = cfg.proc_name;
        let mut builder = env_logger::Builder::new();
        // Everything is filtered a layer above.
        builder.filter_level(log::LevelFilter::Trace);
        builder.target(target);
        builder.format(move |buf, record| {
            writeln!(
                buf,
                "[{}:{}:{}:{}] {}",
                proc_name,
                record.level(),
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        });
        PlatformLogger {
            logger: Some(builder.build()),
        }
    }

    pub(crate) fn log(&self, record: &Record) {
        if let Some(logger) = &self.logger {
            logger.log(record);
        }
    }

    pub(crate) fn flush(&self) {
        if let Some(logger) = &self.logger {
            logger.flush();
        }
    }
}
