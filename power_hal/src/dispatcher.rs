// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Turns hints into constraint writes.
//!
//! Each hint maps to a fixed list of `HintAction`s: which handle to write and how to clamp the
//! value. The values themselves come from the board's hint tables, so a hint only touches the
//! handles the board both has and configured for it.

use std::collections::BTreeSet;

use base::debug;
use base::info;

use crate::cluster::CpuCluster;
use crate::cluster::FreqKnob;
use crate::hint::HintData;
use crate::hint::HintPayload;
use crate::hint::PowerHint;
use crate::info::write_or_log;
use crate::info::Knob;
use crate::info::PowerHalInfo;
use crate::sysfs::PM_QOS_DEFAULT_VALUE;
use crate::timing::HintTimer;

/// Floor or ceiling handle of a knob. A floor takes the hint's `min`, a ceiling its `max`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Min,
    Max,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The given handle of every CPU cluster, each with its own hint table.
    Cluster(FreqKnob),
    Gpu(Side),
    Emc(Side),
    OnlineCpus(Side),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Clamp {
    /// Write the configured value as is.
    Exact,
    /// Round up to the cluster's next frequency step.
    StepUp,
    /// Round down to the cluster's previous frequency step.
    StepDown,
    /// Keep within 1..=possible CPUs.
    CpuCount,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HintAction {
    pub target: Target,
    pub clamp: Clamp,
}

const fn act(target: Target, clamp: Clamp) -> HintAction {
    HintAction { target, clamp }
}

const CPU_FLOOR: HintAction = act(Target::Cluster(FreqKnob::Min), Clamp::StepUp);
const CPU_CAP: HintAction = act(Target::Cluster(FreqKnob::Max), Clamp::StepDown);
const VSYNC_FLOOR: HintAction = act(Target::Cluster(FreqKnob::VsyncMin), Clamp::StepUp);
const GPU_FLOOR: HintAction = act(Target::Gpu(Side::Min), Clamp::Exact);
const GPU_CAP: HintAction = act(Target::Gpu(Side::Max), Clamp::Exact);
const EMC_FLOOR: HintAction = act(Target::Emc(Side::Min), Clamp::Exact);
const CORES_FLOOR: HintAction = act(Target::OnlineCpus(Side::Min), Clamp::CpuCount);
const CORES_CAP: HintAction = act(Target::OnlineCpus(Side::Max), Clamp::CpuCount);

/// The actions a hint performs. Empty for hints this HAL ignores.
pub fn actions(hint: PowerHint) -> &'static [HintAction] {
    use PowerHint::*;

    match hint {
        Vsync => &[VSYNC_FLOOR],
        Interaction => &[CPU_FLOOR, GPU_FLOOR, EMC_FLOOR, CORES_FLOOR],
        Launch | AppLaunch => &[CPU_FLOOR, CPU_CAP, GPU_FLOOR, EMC_FLOOR, CORES_FLOOR],
        LowPower => &[CPU_CAP, GPU_CAP, CORES_CAP],
        SustainedPerformance => &[CPU_CAP, GPU_CAP],
        AudioLowLatency | VideoEncode | VideoDecode | HighResVideo | Camera => {
            &[CPU_FLOOR, CORES_FLOOR]
        }
        MultithreadBoost => &[CORES_FLOOR],
        _ => &[],
    }
}

fn bound(data: &HintData, side: Side) -> i32 {
    match side {
        Side::Min => data.min,
        Side::Max => data.max,
    }
}

/// The hints holding a handle and the clamp each applies to it.
type Holders = Vec<(PowerHint, Clamp)>;

/// The hints that act on `target`: every mode currently on plus `pulse`, a one-shot hint being
/// applied now.
fn holders(
    active: &BTreeSet<PowerHint>,
    pulse: Option<PowerHint>,
    target: Target,
) -> Holders {
    active
        .iter()
        .copied()
        .chain(pulse)
        .filter_map(|hint| {
            actions(hint)
                .iter()
                .find(|a| a.target == target)
                .map(|a| (hint, a.clamp))
        })
        .collect()
}

/// The value a handle should hold given what each holder asks for: the highest floor or the
/// lowest ceiling. `PM_QOS_DEFAULT_VALUE` once no holder asks for anything.
fn resolve<F>(side: Side, holders: &Holders, value: F) -> i32
where
    F: Fn(PowerHint, Clamp) -> Option<i32>,
{
    let values = holders.iter().filter_map(|&(hint, clamp)| value(hint, clamp));
    match side {
        Side::Min => values.max(),
        Side::Max => values.min(),
    }
    .unwrap_or(PM_QOS_DEFAULT_VALUE)
}

/// The bound `data` sets for `side`, if it sets one.
fn configured(data: Option<&HintData>, side: Side) -> Option<i32> {
    data.map(|d| bound(d, side)).filter(|&v| v > 0)
}

pub struct HintDispatcher {
    info: PowerHalInfo,
    timer: HintTimer,
    /// Hints switched on with `Enabled(true)` and not yet switched off.
    active: BTreeSet<PowerHint>,
}

impl HintDispatcher {
    pub fn new(info: PowerHalInfo, timer: HintTimer) -> Self {
        HintDispatcher {
            info,
            timer,
            active: BTreeSet::new(),
        }
    }

    pub fn info(&self) -> &PowerHalInfo {
        &self.info
    }

    /// Hints currently switched on.
    pub fn active(&self) -> impl Iterator<Item = PowerHint> + '_ {
        self.active.iter().copied()
    }

    /// Applies `hint`, or lifts it when `payload` is `Enabled(false)`.
    ///
    /// Hints share the constraint handles. Each handle written is set from every hint still
    /// holding it, so lifting one hint leaves the others in force.
    ///
    /// Activations of a rate limited hint that arrive within its interval are dropped. Releases
    /// are never dropped so a constraint cannot be left behind.
    pub fn dispatch(&mut self, hint: PowerHint, payload: HintPayload) {
        let actions = actions(hint);
        if actions.is_empty() {
            debug!("no handler for hint {}", hint);
            return;
        }

        if payload.is_release() {
            self.active.remove(&hint);
        } else {
            if !self.timer.try_issue(hint) {
                debug!(
                    "hint {} suppressed, last issued less than {:?} ago",
                    hint,
                    self.timer.min_interval(hint)
                );
                return;
            }
            if payload == HintPayload::Enabled(true) {
                self.active.insert(hint);
            }
        }
        let pulse = match payload {
            HintPayload::None | HintPayload::Value(_) => Some(hint),
            HintPayload::Enabled(_) => None,
        };

        debug!("hint {} {:?}", hint, payload);
        for action in actions {
            self.apply(hint, *action, pulse);
        }
    }

    fn apply(&mut self, hint: PowerHint, action: HintAction, pulse: Option<PowerHint>) {
        let holders = holders(&self.active, pulse, action.target);
        let possible_cpus = self.info.possible_cpus;
        match action.target {
            Target::Cluster(knob) => {
                let side = match knob {
                    FreqKnob::Max => Side::Max,
                    FreqKnob::Min | FreqKnob::VsyncMin => Side::Min,
                };
                for cluster in &mut self.info.clusters {
                    if configured(cluster.hints.get(&hint), side).is_none() {
                        continue;
                    }
                    let value = {
                        let cluster: &CpuCluster = cluster;
                        resolve(side, &holders, |h, clamp| {
                            configured(cluster.hints.get(&h), side)
                                .map(|v| clamp_cluster(cluster, v, clamp))
                        })
                    };
                    write_or_log(cluster.node_mut(knob), value);
                }
            }
            Target::Gpu(side) | Target::Emc(side) | Target::OnlineCpus(side) => {
                let knob = match action.target {
                    Target::Gpu(_) => &mut self.info.gpu,
                    Target::Emc(_) => &mut self.info.emc,
                    _ => &mut self.info.online_cpus,
                };
                apply_knob(knob, hint, side, &holders, possible_cpus);
            }
        }
    }

    /// Enables input devices and raises the power-level floor when the device becomes
    /// interactive; undoes both when it goes to sleep. Going to sleep also drops the VSYNC
    /// floor.
    pub fn set_interactive(&mut self, on: bool) {
        info!("interactive {}", if on { "on" } else { "off" });
        for dev in &mut self.info.input_devs {
            if write_or_log(dev.enabled.as_mut(), on as i32) {
                debug!("input device {} enabled={}", dev.name, on);
            }
        }
        if write_or_log(self.info.power_level_floor.as_mut(), on as i32) {
            debug!("power level floor {}", on as i32);
        }
        if !on {
            self.dispatch(PowerHint::Vsync, HintPayload::Enabled(false));
        }
    }
}

fn clamp_cluster(cluster: &CpuCluster, value: i32, clamp: Clamp) -> i32 {
    match clamp {
        Clamp::StepUp => cluster.floor_freq(value),
        Clamp::StepDown => cluster.ceiling_freq(value),
        Clamp::Exact | Clamp::CpuCount => value,
    }
}

fn apply_knob(
    knob: &mut Knob,
    hint: PowerHint,
    side: Side,
    holders: &Holders,
    possible_cpus: usize,
) {
    if configured(knob.hints.get(&hint), side).is_none() {
        return;
    }
    let value = resolve(side, holders, |h, clamp| {
        configured(knob.hints.get(&h), side).map(|v| match clamp {
            Clamp::CpuCount => v.clamp(1, possible_cpus.max(1) as i32),
            Clamp::Exact | Clamp::StepUp | Clamp::StepDown => v,
        })
    });
    let node = match side {
        Side::Min => knob.min.as_mut(),
        Side::Max => knob.max.as_mut(),
    };
    write_or_log(node, value);
}
