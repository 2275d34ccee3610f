// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

// Installs the process-wide logger, so this file holds a single test.

use std::collections::BTreeMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::PathBuf;

use base::syslog;
use base::syslog::LogConfig;
use power_hal::aidl::Mode;
use power_hal::config::ClusterConfig;
use power_hal::hint::HintData;
use power_hal::property::PropertyFile;
use power_hal::test_utils::make_full;
use power_hal::test_utils::read_lines;
use power_hal::test_utils::touch;
use power_hal::test_utils::RecordingTimer;
use power_hal::DeviceConfig;
use power_hal::HintDispatcher;
use power_hal::HintTimer;
use power_hal::IPower;
use power_hal::Power;
use power_hal::PowerHalInfo;
use power_hal::PowerHint;
use power_hal::Sysfs;
use tempfile::tempdir;

#[test]
fn failed_write_is_logged_as_error() {
    let mut log_file = tempfile::tempfile().unwrap();
    syslog::init_with(LogConfig {
        log_level: "error".to_string(),
        pipe: Some(Box::new(log_file.try_clone().unwrap())),
        proc_name: "powerhal-test".to_string(),
        ..Default::default()
    })
    .unwrap();

    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(root, "/sys/cpu/freqs", "204000 1020000 1912500\n");
    touch(root, "/sys/devices/system/cpu/possible", "0-3\n");
    touch(root, "/dev/cpu_freq_min", "");
    make_full(root, "/dev/cpu_freq_max");

    let cfg = DeviceConfig {
        clusters: vec![ClusterConfig {
            name: "cpu".to_string(),
            available_freqs_path: PathBuf::from("/sys/cpu/freqs"),
            min_freq_path: Some(PathBuf::from("/dev/cpu_freq_min")),
            max_freq_path: Some(PathBuf::from("/dev/cpu_freq_max")),
            vsync_min_freq_path: None,
            hints: BTreeMap::from([(PowerHint::Launch, HintData::new(1020000, 1912500, 0))]),
        }],
        ..Default::default()
    };
    let info = PowerHalInfo::open(&Sysfs::new(root), &cfg, &PropertyFile::empty());
    let timer = HintTimer::new(Box::new(base::Clock::new()), std::iter::empty());
    let power = Power::new(
        HintDispatcher::new(info, timer),
        Box::new(RecordingTimer::default()),
    );

    assert_eq!(power.setMode(Mode::Launch, true), Ok(()));
    assert_eq!(read_lines(root, "/dev/cpu_freq_min"), ["1020000"]);

    syslog::flush();
    log_file.seek(SeekFrom::Start(0)).unwrap();
    let mut logged = String::new();
    log_file.read_to_string(&mut logged).unwrap();

    let record = logged
        .lines()
        .find(|line| line.contains("/dev/cpu_freq_max"))
        .unwrap_or_else(|| panic!("no record names the failed node in {:?}", logged));
    assert!(record.contains("ERROR"), "{}", record);
    assert!(record.contains("1912500"), "{}", record);
    assert!(record.contains("powerhal-test"), "{}", record);
}
