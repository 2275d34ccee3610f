// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Runs the Tegra power HAL service.

mod host;

use std::io;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use base::error;
use base::info;
use base::syslog;
use base::Clock;
use power_hal::property::PropertyFile;
use power_hal::property::PropertySource;
use power_hal::AtaStandbyTimer;
use power_hal::DeviceConfig;
use power_hal::HintDispatcher;
use power_hal::HintTimer;
use power_hal::Power;
use power_hal::PowerHalInfo;
use power_hal::Sysfs;

#[derive(FromArgs)]
/// Power HAL for Tegra devices. Reads one JSON request per line on stdin and answers each on
/// stdout.
struct Args {
    /// device configuration file (default: built-in foster board)
    #[argh(option, arg_name = "PATH")]
    config: Option<PathBuf>,

    /// directory that all control file paths are resolved under
    #[argh(option, arg_name = "PATH", default = "PathBuf::from(\"/\")")]
    sysfs_root: PathBuf,

    /// system properties as key=value lines, read instead of the property service
    #[argh(option, arg_name = "PATH")]
    property_file: Option<PathBuf>,

    /// log filter, e.g. "debug" or "power_hal::dispatcher=trace"
    #[argh(option, arg_name = "FILTER", default = "String::from(\"info\")")]
    log_level: String,

    /// print the device configuration in use and exit
    #[argh(switch)]
    dump_config: bool,
}

fn load_properties(path: Option<&Path>) -> anyhow::Result<Box<dyn PropertySource>> {
    if let Some(path) = path {
        let props = PropertyFile::load(path)
            .with_context(|| format!("failed to read properties from {}", path.display()))?;
        return Ok(Box::new(props));
    }
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            Ok(Box::new(power_hal::property::SystemProperties))
        } else {
            Ok(Box::new(PropertyFile::empty()))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let cfg = match &args.config {
        Some(path) => DeviceConfig::from_file(path)
            .with_context(|| format!("failed to load device config {}", path.display()))?,
        None => DeviceConfig::default(),
    };
    if args.dump_config {
        println!("{}", cfg.to_json());
        return Ok(());
    }

    let props = load_properties(args.property_file.as_deref())?;
    let sysfs = Sysfs::new(&args.sysfs_root);

    let mut info = PowerHalInfo::open(&sysfs, &cfg, props.as_ref());
    info.init();

    let timer = HintTimer::new(
        Box::new(Clock::new()),
        cfg.hint_interval_ms
            .keys()
            .map(|&hint| (hint, cfg.hint_interval(hint))),
    );
    let standby = AtaStandbyTimer::new(sysfs.resolve(&cfg.sata_block_device));
    let power = Power::new(HintDispatcher::new(info, timer), Box::new(standby));

    info!("power HAL ready");
    host::serve(io::stdin().lock(), io::stdout().lock(), &power)
        .context("failed to serve requests")?;
    info!("request stream closed, exiting");
    Ok(())
}

fn main() {
    let args: Args = argh::from_env();

    let log_config = syslog::LogConfig {
        log_level: args.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = syslog::init_with(log_config) {
        eprintln!("failed to initialize syslog: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{:#}", e);
        syslog::flush();
        std::process::exit(1);
    }
}
