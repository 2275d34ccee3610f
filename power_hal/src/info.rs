// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Everything the HAL knows about the device, resolved once at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use base::error;
use base::info;
use base::warn;

use crate::cluster::CpuCluster;
use crate::config::AppProfileDefaults;
use crate::config::DeviceConfig;
use crate::config::KnobConfig;
use crate::config::POWER_CAP_PROP;
use crate::hint::HintData;
use crate::hint::PowerHint;
use crate::property::PropertySource;
use crate::sysfs::ControlNode;
use crate::sysfs::Sysfs;

const INPUT_CLASS_PATH: &str = "/sys/class/input";

/// Optional hardware features, probed once when the device is opened.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub fan: bool,
    pub power_cap: bool,
    pub power_level_floor: bool,
    pub gpu_floor: bool,
    pub gpu_cap: bool,
    pub emc_floor: bool,
    pub online_cpus_floor: bool,
    pub online_cpus_cap: bool,
    pub sata_standby: bool,
}

/// A floor/ceiling pair of constraint handles with the hint table that drives them.
#[derive(Default)]
pub struct Knob {
    pub min: Option<ControlNode>,
    pub max: Option<ControlNode>,
    pub hints: BTreeMap<PowerHint, HintData>,
}

impl Knob {
    fn open(sysfs: &Sysfs, cfg: &KnobConfig) -> Self {
        let open = |path: &Option<PathBuf>| path.as_ref().and_then(|p| sysfs.open_if_present(p));
        Knob {
            min: open(&cfg.min_path),
            max: open(&cfg.max_path),
            hints: cfg.hints.clone(),
        }
    }
}

/// An input device the HAL switches off while the device is not interactive.
pub struct InputDevice {
    pub name: String,
    /// The N in `/sys/class/input/inputN`, if a device with this name was found.
    pub id: Option<u32>,
    pub enabled: Option<ControlNode>,
}

pub struct PowerHalInfo {
    pub clusters: Vec<CpuCluster>,
    pub gpu: Knob,
    pub emc: Knob,
    pub online_cpus: Knob,
    pub possible_cpus: usize,
    pub input_devs: Vec<InputDevice>,
    pub features: Capabilities,
    pub defaults: AppProfileDefaults,
    pub fan_cap: Option<ControlNode>,
    pub power_cap: Option<ControlNode>,
    pub power_level_floor: Option<ControlNode>,
}

impl PowerHalInfo {
    /// Opens every control file `cfg` names that exists on this device.
    ///
    /// Nothing here is fatal: a file that is missing or cannot be opened turns the feature off.
    pub fn open(sysfs: &Sysfs, cfg: &DeviceConfig, props: &dyn PropertySource) -> Self {
        let clusters: Vec<CpuCluster> = cfg
            .clusters
            .iter()
            .map(|c| CpuCluster::open(sysfs, c))
            .collect();
        let gpu = Knob::open(sysfs, &cfg.gpu);
        let emc = Knob::open(sysfs, &cfg.emc);
        let online_cpus = Knob::open(sysfs, &cfg.online_cpus);

        let possible_cpus = sysfs.possible_cpus().unwrap_or_else(|e| {
            let online = std::thread::available_parallelism().map_or(1, |n| n.get());
            warn!("{}, assuming {} cpus", e, online);
            online
        });

        let input_devs = resolve_input_devices(sysfs, &cfg.input_devices);
        let fan_cap = cfg.fan_cap_path.as_ref().and_then(|p| sysfs.open_if_present(p));
        let power_cap = cfg
            .power_cap_path
            .as_ref()
            .and_then(|p| sysfs.open_if_present(p));
        let power_level_floor = cfg
            .power_level_floor_path
            .as_ref()
            .and_then(|p| sysfs.open_if_present(p));

        let mut defaults = cfg.defaults;
        if let Some(cap) = props.get_int(POWER_CAP_PROP) {
            info!("{}={}, using it as the default power cap", POWER_CAP_PROP, cap);
            defaults.power_cap = cap;
        }

        let features = Capabilities {
            fan: fan_cap.is_some(),
            power_cap: power_cap.is_some(),
            power_level_floor: power_level_floor.is_some(),
            gpu_floor: gpu.min.is_some(),
            gpu_cap: gpu.max.is_some(),
            emc_floor: emc.min.is_some(),
            online_cpus_floor: online_cpus.min.is_some(),
            online_cpus_cap: online_cpus.max.is_some(),
            sata_standby: sysfs.exists(&cfg.sata_power_control_path),
        };
        info!("device capabilities: {:?}", features);

        PowerHalInfo {
            clusters,
            gpu,
            emc,
            online_cpus,
            possible_cpus,
            input_devs,
            features,
            defaults,
            fan_cap,
            power_cap,
            power_level_floor,
        }
    }

    /// Writes the startup defaults.
    pub fn init(&mut self) {
        let defaults = self.defaults;
        for cluster in &mut self.clusters {
            write_or_log(cluster.app_min_freq.as_mut(), defaults.min_freq);
            write_or_log(cluster.app_max_freq.as_mut(), defaults.max_freq);
        }
        write_or_log(self.online_cpus.max.as_mut(), defaults.core_cap);
        write_or_log(self.gpu.max.as_mut(), defaults.gpu_cap);
        if defaults.fan_cap >= 0 {
            write_or_log(self.fan_cap.as_mut(), defaults.fan_cap);
        }
        if defaults.power_cap >= 0 {
            write_or_log(self.power_cap.as_mut(), defaults.power_cap);
        }
    }
}

/// Writes `value` to `node` if the node exists. Failures are logged, never returned: the
/// device keeps working with the previous setting.
///
/// Returns whether a write succeeded.
pub(crate) fn write_or_log(node: Option<&mut ControlNode>, value: i32) -> bool {
    match node {
        Some(node) => match node.write_value(value) {
            Ok(()) => true,
            Err(e) => {
                error!("{}", e);
                false
            }
        },
        None => false,
    }
}

fn resolve_input_devices(sysfs: &Sysfs, names: &[String]) -> Vec<InputDevice> {
    let entries = if names.is_empty() {
        Vec::new()
    } else {
        sysfs.list_dir(INPUT_CLASS_PATH).unwrap_or_else(|e| {
            warn!("{}", e);
            Vec::new()
        })
    };

    // The id and the name reported by each `inputN` entry.
    let present: Vec<(u32, String)> = entries
        .iter()
        .filter_map(|entry| {
            let id = entry.strip_prefix("input")?.parse().ok()?;
            let name_path = Path::new(INPUT_CLASS_PATH).join(entry).join("name");
            let name = sysfs.read_string(name_path).ok()?;
            Some((id, name.trim().to_string()))
        })
        .collect();

    names
        .iter()
        .map(|name| {
            let id = present
                .iter()
                .find(|(_, present_name)| present_name == name)
                .map(|(id, _)| *id);
            let enabled = match id {
                Some(id) => sysfs.open_if_present(
                    Path::new(INPUT_CLASS_PATH)
                        .join(format!("input{}", id))
                        .join("enabled"),
                ),
                None => {
                    info!("input device {} not found", name);
                    None
                }
            };
            InputDevice {
                name: name.clone(),
                id,
                enabled,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use tempfile::TempDir;

    use super::*;
    use crate::config::ClusterConfig;
    use crate::property::PropertyFile;
    use crate::test_utils::make_full;
    use crate::test_utils::read_lines;
    use crate::test_utils::touch;

    fn small_config() -> DeviceConfig {
        DeviceConfig {
            clusters: vec![ClusterConfig {
                name: "cpu0".to_string(),
                available_freqs_path: PathBuf::from("/sys/freqs0"),
                min_freq_path: Some(PathBuf::from("/dev/cpu_freq_min")),
                max_freq_path: Some(PathBuf::from("/dev/cpu_freq_max")),
                vsync_min_freq_path: None,
                hints: BTreeMap::new(),
            }],
            gpu: KnobConfig::default(),
            emc: KnobConfig::default(),
            online_cpus: KnobConfig {
                min_path: Some(PathBuf::from("/dev/min_online_cpus")),
                max_path: Some(PathBuf::from("/dev/max_online_cpus")),
                hints: BTreeMap::new(),
            },
            input_devices: vec!["touch".to_string(), "raydium_ts".to_string()],
            fan_cap_path: Some(PathBuf::from("/sys/fan/pwm_cap")),
            power_cap_path: Some(PathBuf::from("/sys/pbc/power_limit")),
            ..Default::default()
        }
    }

    fn board() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(root, "/sys/freqs0", "204000 1020000 1912500\n");
        touch(root, "/sys/devices/system/cpu/possible", "0-3\n");
        touch(root, "/dev/cpu_freq_min", "");
        touch(root, "/dev/cpu_freq_max", "");
        touch(root, "/dev/max_online_cpus", "");
        touch(root, "/sys/pbc/power_limit", "");
        touch(root, "/sys/class/input/input0/name", "gpio-keys\n");
        touch(root, "/sys/class/input/input3/name", "touch\n");
        touch(root, "/sys/class/input/input3/enabled", "");
        dir
    }

    #[test]
    fn open_probes_capabilities() {
        let dir = board();
        let info = PowerHalInfo::open(
            &Sysfs::new(dir.path()),
            &small_config(),
            &PropertyFile::empty(),
        );

        assert_eq!(info.clusters.len(), 1);
        assert_eq!(info.possible_cpus, 4);
        assert_eq!(
            info.features,
            Capabilities {
                power_cap: true,
                online_cpus_cap: true,
                ..Default::default()
            }
        );
        assert!(info.online_cpus.min.is_none());
    }

    #[test]
    fn input_devices_resolved_by_name() {
        let dir = board();
        let info = PowerHalInfo::open(
            &Sysfs::new(dir.path()),
            &small_config(),
            &PropertyFile::empty(),
        );

        assert_eq!(info.input_devs.len(), 2);
        assert_eq!(info.input_devs[0].name, "touch");
        assert_eq!(info.input_devs[0].id, Some(3));
        assert!(info.input_devs[0].enabled.is_some());
        assert_eq!(info.input_devs[1].id, None);
        assert!(info.input_devs[1].enabled.is_none());
    }

    #[test]
    fn init_writes_defaults_and_power_cap_property() {
        let dir = board();
        let props = PropertyFile::parse("persist.sys.NV_PBC_PWR_LIMIT=7500\n");
        let mut info = PowerHalInfo::open(&Sysfs::new(dir.path()), &small_config(), &props);
        assert_eq!(info.defaults.power_cap, 7500);

        info.init();

        let root = dir.path();
        assert_eq!(read_lines(root, "/dev/cpu_freq_min"), ["-1"]);
        assert_eq!(read_lines(root, "/dev/cpu_freq_max"), ["-1"]);
        assert_eq!(read_lines(root, "/dev/max_online_cpus"), ["-1"]);
        assert_eq!(read_lines(root, "/sys/pbc/power_limit"), ["7500"]);
    }

    #[test]
    fn power_cap_left_alone_without_property() {
        let dir = board();
        let mut info = PowerHalInfo::open(
            &Sysfs::new(dir.path()),
            &small_config(),
            &PropertyFile::empty(),
        );
        info.init();
        assert!(read_lines(dir.path(), "/sys/pbc/power_limit").is_empty());
    }

    #[test]
    fn write_or_log_reports_outcome() {
        let dir = board();
        let sysfs = Sysfs::new(dir.path());
        let mut node = sysfs.open_node("/dev/cpu_freq_min").unwrap();
        assert!(write_or_log(node.as_mut(), 204000));
        assert!(!write_or_log(None, 204000));

        make_full(dir.path(), "/dev/full_node");
        let mut full = sysfs.open_node("/dev/full_node").unwrap();
        assert!(!write_or_log(full.as_mut(), 1));
    }
}
