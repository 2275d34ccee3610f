// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Board description: which control files exist and what each hint writes to them.
//!
//! The description is plain data so a board can be brought up by editing a JSON file instead
//! of code. `DeviceConfig::default()` describes the Tegra X1 "foster" board.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use remain::sorted;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::hint::HintData;
use crate::hint::PowerHint;
use crate::sysfs::PM_QOS_DEFAULT_VALUE;

/// Persisted property holding the board power cap.
pub const POWER_CAP_PROP: &str = "persist.sys.NV_PBC_PWR_LIMIT";

pub const SATA_POWER_CONTROL_PATH: &str = "/sys/devices/tegra-sata.0/ata1/power/control";
pub const SATA_BLOCK_DEVICE_PATH: &str = "/dev/block/sda";

#[sorted]
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid device config: {0}")]
    Invalid(String),
    #[error("failed to parse device config {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to read device config {0}: {1}")]
    Read(PathBuf, std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// One CPU frequency domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    pub name: String,
    /// sysfs list of the frequency steps the cluster supports, in kHz.
    pub available_freqs_path: PathBuf,
    /// Constraint file for the frequency floor.
    pub min_freq_path: Option<PathBuf>,
    /// Constraint file for the frequency ceiling.
    pub max_freq_path: Option<PathBuf>,
    /// Constraint file for the floor held while VSYNC is active.
    #[serde(default)]
    pub vsync_min_freq_path: Option<PathBuf>,
    #[serde(default)]
    pub hints: BTreeMap<PowerHint, HintData>,
}

/// A knob with a floor and/or ceiling constraint file, e.g. GPU frequency or online CPUs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct KnobConfig {
    pub min_path: Option<PathBuf>,
    pub max_path: Option<PathBuf>,
    pub hints: BTreeMap<PowerHint, HintData>,
}

/// Values written at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppProfileDefaults {
    pub min_freq: i32,
    pub max_freq: i32,
    pub core_cap: i32,
    pub gpu_cap: i32,
    pub fan_cap: i32,
    pub power_cap: i32,
}

impl Default for AppProfileDefaults {
    fn default() -> Self {
        AppProfileDefaults {
            min_freq: PM_QOS_DEFAULT_VALUE,
            max_freq: PM_QOS_DEFAULT_VALUE,
            core_cap: PM_QOS_DEFAULT_VALUE,
            gpu_cap: PM_QOS_DEFAULT_VALUE,
            fan_cap: PM_QOS_DEFAULT_VALUE,
            power_cap: PM_QOS_DEFAULT_VALUE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DeviceConfig {
    pub clusters: Vec<ClusterConfig>,
    pub gpu: KnobConfig,
    pub emc: KnobConfig,
    pub online_cpus: KnobConfig,
    /// Minimum time between two activations of the same hint, in milliseconds.
    pub hint_interval_ms: BTreeMap<PowerHint, u64>,
    /// Names (as reported by `/sys/class/input/input*/name`) of devices to switch off while
    /// the display is off.
    pub input_devices: Vec<String>,
    pub fan_cap_path: Option<PathBuf>,
    pub power_cap_path: Option<PathBuf>,
    /// Power-level floor node, held at 1 while the display is on and 0 while it is off.
    pub power_level_floor_path: Option<PathBuf>,
    /// Present only on boards with the SATA controller; gates the disk standby timer.
    pub sata_power_control_path: PathBuf,
    pub sata_block_device: PathBuf,
    pub defaults: AppProfileDefaults,
}

impl DeviceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::Read(path.to_path_buf(), e))?;
        Self::from_json(&content).map_err(|e| match e {
            Error::Parse(_, e) => Error::Parse(path.to_path_buf(), e),
            e => e,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: DeviceConfig =
            serde_json::from_str(json).map_err(|e| Error::Parse(PathBuf::new(), e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.clusters.is_empty() {
            return Err(Error::Invalid("at least one cpu cluster is required".into()));
        }
        for (i, cluster) in self.clusters.iter().enumerate() {
            if cluster.name.is_empty() {
                return Err(Error::Invalid(format!("cluster {} has no name", i)));
            }
            if self.clusters[..i].iter().any(|c| c.name == cluster.name) {
                return Err(Error::Invalid(format!(
                    "duplicate cluster name {}",
                    cluster.name
                )));
            }
            check_hint_data(&cluster.name, &cluster.hints)?;
        }
        check_hint_data("gpu", &self.gpu.hints)?;
        check_hint_data("emc", &self.emc.hints)?;
        check_hint_data("online_cpus", &self.online_cpus.hints)?;
        Ok(())
    }

    pub fn hint_interval(&self, hint: PowerHint) -> Duration {
        Duration::from_millis(self.hint_interval_ms.get(&hint).copied().unwrap_or(0))
    }
}

fn check_hint_data(owner: &str, hints: &BTreeMap<PowerHint, HintData>) -> Result<()> {
    for (hint, data) in hints {
        if data.min < 0 || data.max < 0 || data.time_ms < 0 {
            return Err(Error::Invalid(format!(
                "{}: negative bound for {}",
                owner, hint
            )));
        }
        if data.min > 0 && data.max > 0 && data.min > data.max {
            return Err(Error::Invalid(format!(
                "{}: min {} above max {} for {}",
                owner, data.min, data.max, hint
            )));
        }
    }
    Ok(())
}

impl Default for DeviceConfig {
    fn default() -> Self {
        use PowerHint::*;

        let cpu_hints = BTreeMap::from([
            (Vsync, HintData::new(510000, 0, 0)),
            (Interaction, HintData::new(1020000, 0, 90)),
            (Launch, HintData::new(1428000, 1912500, 0)),
            (AppLaunch, HintData::new(1428000, 1912500, 0)),
            (AudioLowLatency, HintData::new(510000, 0, 0)),
            (LowPower, HintData::new(0, 1020000, 0)),
            (SustainedPerformance, HintData::new(0, 1428000, 0)),
            (VideoDecode, HintData::new(510000, 0, 0)),
            (Camera, HintData::new(918000, 0, 0)),
        ]);
        let gpu_hints = BTreeMap::from([
            (Interaction, HintData::new(230400, 0, 90)),
            (Launch, HintData::new(537600, 0, 0)),
            (AppLaunch, HintData::new(537600, 0, 0)),
            (LowPower, HintData::new(0, 460800, 0)),
            (SustainedPerformance, HintData::new(0, 768000, 0)),
        ]);
        let emc_hints = BTreeMap::from([
            (Interaction, HintData::new(408000, 0, 90)),
            (Launch, HintData::new(800000, 0, 0)),
            (AppLaunch, HintData::new(800000, 0, 0)),
        ]);
        let online_cpu_hints = BTreeMap::from([
            (Interaction, HintData::new(2, 0, 90)),
            (Launch, HintData::new(4, 0, 0)),
            (AppLaunch, HintData::new(4, 0, 0)),
            (AudioLowLatency, HintData::new(2, 0, 0)),
            (MultithreadBoost, HintData::new(4, 0, 0)),
            (LowPower, HintData::new(0, 2, 0)),
        ]);

        DeviceConfig {
            clusters: vec![ClusterConfig {
                name: "cpu0".to_string(),
                available_freqs_path: PathBuf::from(
                    "/sys/devices/system/cpu/cpu0/cpufreq/scaling_available_frequencies",
                ),
                min_freq_path: Some(PathBuf::from("/dev/cpu_freq_min")),
                max_freq_path: Some(PathBuf::from("/dev/cpu_freq_max")),
                vsync_min_freq_path: Some(PathBuf::from("/dev/cpu_freq_min")),
                hints: cpu_hints,
            }],
            gpu: KnobConfig {
                min_path: Some(PathBuf::from("/dev/gpu_freq_min")),
                max_path: Some(PathBuf::from("/dev/gpu_freq_max")),
                hints: gpu_hints,
            },
            emc: KnobConfig {
                min_path: Some(PathBuf::from("/dev/emc_freq_min")),
                max_path: None,
                hints: emc_hints,
            },
            online_cpus: KnobConfig {
                min_path: Some(PathBuf::from("/dev/min_online_cpus")),
                max_path: Some(PathBuf::from("/dev/max_online_cpus")),
                hints: online_cpu_hints,
            },
            hint_interval_ms: BTreeMap::from([
                (Interaction, 90),
                (Launch, 1000),
                (AppLaunch, 1000),
            ]),
            input_devices: vec!["touch".to_string(), "raydium_ts".to_string()],
            fan_cap_path: Some(PathBuf::from("/sys/devices/platform/pwm-fan/pwm_cap")),
            power_cap_path: None,
            power_level_floor_path: None,
            sata_power_control_path: PathBuf::from(SATA_POWER_CONTROL_PATH),
            sata_block_device: PathBuf::from(SATA_BLOCK_DEVICE_PATH),
            defaults: AppProfileDefaults {
                fan_cap: 255,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DeviceConfig::default().validate().expect("default config invalid");
    }

    #[test]
    fn default_config_survives_json() {
        let cfg = DeviceConfig::default();
        let parsed = DeviceConfig::from_json(&cfg.to_json()).expect("parse failed");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg = DeviceConfig::from_json(
            r#"{
                "clusters": [{
                    "name": "little",
                    "available_freqs_path": "/sys/devices/system/cpu/cpu0/cpufreq/scaling_available_frequencies",
                    "min_freq_path": null,
                    "max_freq_path": "/dev/cpu_freq_max",
                    "hints": { "launch": { "max": 1500000 } }
                }],
                "hint_interval_ms": { "interaction": 50 }
            }"#,
        )
        .expect("parse failed");
        assert_eq!(cfg.clusters.len(), 1);
        assert_eq!(
            cfg.clusters[0].hints[&PowerHint::Launch],
            HintData::new(0, 1500000, 0)
        );
        assert_eq!(cfg.hint_interval(PowerHint::Interaction), Duration::from_millis(50));
        assert_eq!(cfg.hint_interval(PowerHint::Vsync), Duration::ZERO);
    }

    #[test]
    fn unknown_field_rejected() {
        let err = DeviceConfig::from_json(r#"{ "clusterz": [] }"#).unwrap_err();
        assert!(matches!(err, Error::Parse(..)));
    }

    #[test]
    fn no_clusters_rejected() {
        let err = DeviceConfig::from_json(r#"{ "clusters": [] }"#).unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let mut cfg = DeviceConfig::default();
        cfg.gpu
            .hints
            .insert(PowerHint::Camera, HintData::new(900000, 300000, 0));
        assert!(matches!(cfg.validate(), Err(Error::Invalid(_))));
    }

    #[test]
    fn duplicate_cluster_rejected() {
        let mut cfg = DeviceConfig::default();
        let dup = cfg.clusters[0].clone();
        cfg.clusters.push(dup);
        assert!(matches!(cfg.validate(), Err(Error::Invalid(_))));
    }
}
