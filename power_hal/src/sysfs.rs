// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Access to kernel control files (sysfs attributes and PM QoS constraint devices).
//!
//! Every path the HAL touches is absolute on the device. `Sysfs` resolves those paths under a
//! root directory, which is `/` on a device and a scratch directory when rehearsing a board.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use base::debug;
use base::info;
use base::warn;
use remain::sorted;
use thiserror::Error;

/// Writing this to a constraint handle drops the request back to the kernel default.
pub const PM_QOS_DEFAULT_VALUE: i32 = -1;

const CPU_POSSIBLE_PATH: &str = "/sys/devices/system/cpu/possible";

#[sorted]
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to open {0}: {1}")]
    Open(PathBuf, base::Error),
    #[error("failed to parse {0}: {1:?}")]
    Parse(PathBuf, String),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, base::Error),
    #[error("failed to write {1} to {0}: {2}")]
    Write(PathBuf, i32, base::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A view of the device's kernel control files rooted at some directory.
#[derive(Clone, Debug)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Sysfs { root: root.into() }
    }

    /// The real device tree.
    pub fn system() -> Self {
        Sysfs::new("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a device path to where it lives under this root.
    pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.resolve(path).exists()
    }

    pub fn read_string<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = self.resolve(path);
        fs::read_to_string(&path).map_err(|e| Error::Read(path, e.into()))
    }

    /// Reads a whitespace separated list of integers, such as `scaling_available_frequencies`.
    pub fn read_ints<P: AsRef<Path>>(&self, path: P) -> Result<Vec<i32>> {
        let content = self.read_string(&path)?;
        content
            .split_whitespace()
            .map(|v| {
                v.parse()
                    .map_err(|_| Error::Parse(self.resolve(&path), content.clone()))
            })
            .collect()
    }

    /// Lists the entry names of a directory, sorted.
    pub fn list_dir<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>> {
        let path = self.resolve(path);
        let mut names: Vec<String> = fs::read_dir(&path)
            .map_err(|e| Error::Read(path.clone(), e.into()))?
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Opens a control file for writing.
    ///
    /// Returns `Ok(None)` when the file does not exist: the feature is simply not present on
    /// this device.
    pub fn open_node<P: AsRef<Path>>(&self, path: P) -> Result<Option<ControlNode>> {
        let device_path = path.as_ref().to_path_buf();
        let resolved = self.resolve(&device_path);
        match OpenOptions::new().write(true).open(&resolved) {
            Ok(file) => Ok(Some(ControlNode {
                path: device_path,
                file,
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Open(device_path, e.into())),
        }
    }

    /// Like `open_node`, but any failure is logged and reported as an absent feature.
    pub fn open_if_present<P: AsRef<Path>>(&self, path: P) -> Option<ControlNode> {
        match self.open_node(&path) {
            Ok(Some(node)) => {
                debug!("opened {}", path.as_ref().display());
                Some(node)
            }
            Ok(None) => {
                info!("{} not present", path.as_ref().display());
                None
            }
            Err(e) => {
                warn!("{}, treating as absent", e);
                None
            }
        }
    }

    /// Number of CPUs the kernel may ever bring online.
    pub fn possible_cpus(&self) -> Result<usize> {
        let content = self.read_string(CPU_POSSIBLE_PATH)?;
        parse_cpu_list(content.trim())
            .map(|cpus| cpus.len())
            .ok_or_else(|| Error::Parse(self.resolve(CPU_POSSIBLE_PATH), content))
    }
}

/// Parses a kernel cpu list such as `0-3,6`.
fn parse_cpu_list(s: &str) -> Option<Vec<usize>> {
    let mut cpus = Vec::new();
    for part in s.split(',') {
        let range: Vec<&str> = part.split('-').collect();
        match range.as_slice() {
            [cpu] => cpus.push(cpu.parse().ok()?),
            [first, last] => {
                let first: usize = first.parse().ok()?;
                let last: usize = last.parse().ok()?;
                if last < first {
                    return None;
                }
                cpus.extend(first..=last);
            }
            _ => return None,
        }
    }
    Some(cpus)
}

/// An open handle on a control file.
///
/// The handle stays open for the life of the process: for PM QoS devices the constraint is
/// tied to the open file and disappears when it is closed.
#[derive(Debug)]
pub struct ControlNode {
    path: PathBuf,
    file: File,
}

impl ControlNode {
    /// The device path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `value` as a decimal integer.
    pub fn write_value(&mut self, value: i32) -> Result<()> {
        self.file
            .write_all(format!("{}\n", value).as_bytes())
            .map_err(|e| Error::Write(self.path.clone(), value, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn parse_cpu_list_forms() {
        assert_eq!(parse_cpu_list("0"), Some(vec![0]));
        assert_eq!(parse_cpu_list("0-3"), Some(vec![0, 1, 2, 3]));
        assert_eq!(parse_cpu_list("0-1,4-5"), Some(vec![0, 1, 4, 5]));
        assert_eq!(parse_cpu_list("3-1"), None);
        assert_eq!(parse_cpu_list("0-"), None);
        assert_eq!(parse_cpu_list(""), None);
    }

    #[test]
    fn resolve_under_root() {
        let sysfs = Sysfs::new("/tmp/board");
        assert_eq!(
            sysfs.resolve("/dev/cpu_freq_min"),
            PathBuf::from("/tmp/board/dev/cpu_freq_min")
        );
        assert_eq!(
            Sysfs::system().resolve("/dev/cpu_freq_min"),
            PathBuf::from("/dev/cpu_freq_min")
        );
    }

    #[test]
    fn missing_node_is_absent() {
        let dir = tempdir().unwrap();
        let sysfs = Sysfs::new(dir.path());
        assert!(sysfs.open_node("/dev/gpu_freq_min").unwrap().is_none());
    }

    #[test]
    fn node_writes_decimal_lines() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("dev")).unwrap();
        fs::write(dir.path().join("dev/cpu_freq_max"), "").unwrap();
        let sysfs = Sysfs::new(dir.path());

        let mut node = sysfs.open_node("/dev/cpu_freq_max").unwrap().unwrap();
        assert_eq!(node.path(), Path::new("/dev/cpu_freq_max"));
        node.write_value(1912500).unwrap();
        node.write_value(PM_QOS_DEFAULT_VALUE).unwrap();

        let content = fs::read_to_string(dir.path().join("dev/cpu_freq_max")).unwrap();
        assert_eq!(content, "1912500\n-1\n");
    }

    #[test]
    fn write_failure_carries_errno() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("dev")).unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("dev/cpu_freq_max")).unwrap();
        let sysfs = Sysfs::new(dir.path());

        let mut node = sysfs.open_node("/dev/cpu_freq_max").unwrap().unwrap();
        match node.write_value(5) {
            Err(Error::Write(path, 5, err)) => {
                assert_eq!(path, PathBuf::from("/dev/cpu_freq_max"));
                assert_eq!(err.errno(), libc::ENOSPC);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn read_available_frequencies() {
        let dir = tempdir().unwrap();
        let sysfs = Sysfs::new(dir.path());
        fs::write(dir.path().join("freqs"), "204000 918000 1912500 \n").unwrap();
        assert_eq!(sysfs.read_ints("/freqs").unwrap(), vec![204000, 918000, 1912500]);

        fs::write(dir.path().join("bad"), "204000 fast\n").unwrap();
        assert!(matches!(sysfs.read_ints("/bad"), Err(Error::Parse(..))));
    }

    #[test]
    fn possible_cpus_counts_range() {
        let dir = tempdir().unwrap();
        let cpu_dir = dir.path().join("sys/devices/system/cpu");
        fs::create_dir_all(&cpu_dir).unwrap();
        fs::write(cpu_dir.join("possible"), "0-3\n").unwrap();
        assert_eq!(Sysfs::new(dir.path()).possible_cpus().unwrap(), 4);
    }
}
