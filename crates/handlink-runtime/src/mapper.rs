//! [`StateMapper`] – turns telemetry records into rig transform updates.
//!
//! The mapper owns the [`ChannelState`]: the last value accepted on each of
//! the eleven channels.  Every record is applied as a *change* against that
//! state, so the rig accumulates motion rather than being set to absolute
//! poses.
//!
//! | Channel | Clamp | Update |
//! |---|---|---|
//! | Index, Ring, Pinky | \[-30, 120\] | rotate bones about local Z by Δ × (−70/180)° |
//! | Middle | \[0, 90\] | same |
//! | Thumb | \[-30, 110\] | same |
//! | RotateX/Y/Z | – | rotate root about the matching local axis by Δ° |
//! | TranslateY/Z | – | translate root along the matching local axis by Δ/3000 |
//! | TranslateX | – | as TranslateY/Z, or v/3000 under [`TranslateXPolicy::Absolute`] |
//!
//! Duplicate or reordered records therefore produce wrong cumulative motion.
//! The mapper does not try to detect that.

use std::collections::HashMap;

use handlink_hal::{ROOT_TARGET, RigSink, finger_bone_target};
use handlink_rig::Vec3;
use handlink_types::{Axis, Channel, ChannelLabel, HandError, TelemetryRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Degrees of bone rotation per unit of finger flex.
pub const FINGER_DEGREES_PER_UNIT: f32 = -70.0 / 180.0;

/// Rig units per unit of translation telemetry.
pub const TRANSLATION_DIVISOR: f32 = 3000.0;

/// Clamp range applied to a finger channel before it is stored.
pub fn finger_clamp(channel: Channel) -> Option<(f32, f32)> {
    match channel {
        Channel::IndexFlex | Channel::RingFlex | Channel::PinkyFlex => Some((-30.0, 120.0)),
        Channel::MiddleFlex => Some((0.0, 90.0)),
        Channel::ThumbFlex => Some((-30.0, 110.0)),
        Channel::RotateX
        | Channel::RotateY
        | Channel::RotateZ
        | Channel::TranslateX
        | Channel::TranslateY
        | Channel::TranslateZ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel state
// ─────────────────────────────────────────────────────────────────────────────

/// Last accepted value per channel.  Every channel starts at `0.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelState {
    values: [f32; Channel::COUNT],
}

impl ChannelState {
    pub fn get(&self, channel: Channel) -> f32 {
        self.values[channel.index()]
    }

    fn set(&mut self, channel: Channel, value: f32) {
        self.values[channel.index()] = value;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bindings
// ─────────────────────────────────────────────────────────────────────────────

/// Rig target(s) a channel drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetBinding {
    /// Finger channels drive every bone of the finger.
    Bones(Vec<String>),
    /// Wrist rotation and translation channels drive the hand root.
    Root(String),
}

impl TargetBinding {
    pub fn targets(&self) -> &[String] {
        match self {
            TargetBinding::Bones(bones) => bones,
            TargetBinding::Root(root) => std::slice::from_ref(root),
        }
    }
}

/// Channel → target table.  A channel without an entry is unbound.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: HashMap<Channel, TargetBinding>,
}

impl Bindings {
    /// An empty table: every channel unbound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every channel to the conventional left-hand rig, with
    /// `segments` bones per finger.  Matches
    /// [`SimSceneBuilder::with_hand_rig`][handlink_hal::sim::SimSceneBuilder::with_hand_rig].
    pub fn hand_rig(segments: usize) -> Self {
        let mut bindings = Self::new();
        for channel in Channel::ALL {
            let binding = if channel.is_finger() {
                TargetBinding::Bones(
                    (0..segments)
                        .map(|segment| finger_bone_target(channel, segment))
                        .collect(),
                )
            } else {
                TargetBinding::Root(ROOT_TARGET.to_string())
            };
            bindings.bind(channel, binding);
        }
        bindings
    }

    pub fn bind(&mut self, channel: Channel, binding: TargetBinding) {
        self.map.insert(channel, binding);
    }

    pub fn unbind(&mut self, channel: Channel) -> Option<TargetBinding> {
        self.map.remove(&channel)
    }

    pub fn get(&self, channel: Channel) -> Option<&TargetBinding> {
        self.map.get(&channel)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mapper
// ─────────────────────────────────────────────────────────────────────────────

/// How TranslateX records move the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateXPolicy {
    /// Translate by the change since the previous value, like Y and Z.
    #[default]
    Delta,
    /// Translate by `v / 3000` on every record, ignoring the previous value.
    /// Reproduces rigs tuned against the legacy firmware bridge.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub translate_x: TranslateXPolicy,
}

/// Local transform applied to each bound target for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformUpdate {
    Rotate { axis: Axis, degrees: f32 },
    Translate { offset: Vec3 },
}

pub struct StateMapper {
    state: ChannelState,
    bindings: Bindings,
    config: MapperConfig,
}

impl StateMapper {
    pub fn new(bindings: Bindings, config: MapperConfig) -> Self {
        Self {
            state: ChannelState::default(),
            bindings,
            config,
        }
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    /// Apply one record: update the stored channel value and transform every
    /// bound target.
    ///
    /// Returns the computed update, or `None` when the channel label is not
    /// recognised (nothing changes in that case).  An unbound channel still
    /// updates its stored value; targets the rig does not know are skipped
    /// with a warning.
    pub fn apply(
        &mut self,
        record: &TelemetryRecord,
        rig: &mut dyn RigSink,
    ) -> Option<TransformUpdate> {
        let channel = match &record.channel {
            ChannelLabel::Known(channel) => *channel,
            ChannelLabel::Unrecognized(label) => {
                warn!(error = %HandError::UnknownChannel(label.clone()), "record ignored");
                return None;
            }
        };

        let update = self.advance(channel, record.raw_value);
        trace!(%channel, value = record.raw_value, ?update, "channel updated");

        let Some(binding) = self.bindings.get(channel) else {
            debug!(error = %HandError::Binding(channel), "transform skipped");
            return Some(update);
        };
        for target in binding.targets() {
            if let Err(e) = apply_to_target(rig, target, update) {
                warn!(%channel, %target, error = %e, "rig target not updated");
            }
        }
        Some(update)
    }

    /// Store the new value for `channel` and return the transform implied by
    /// the change.
    fn advance(&mut self, channel: Channel, raw: f32) -> TransformUpdate {
        let previous = self.state.get(channel);
        let value = match finger_clamp(channel) {
            Some((min, max)) => raw.clamp(min, max),
            None => raw,
        };
        self.state.set(channel, value);
        let delta = value - previous;

        let rotate = |axis: Axis, degrees: f32| TransformUpdate::Rotate { axis, degrees };
        let translate = |axis: Axis, amount: f32| TransformUpdate::Translate {
            offset: Vec3::unit(axis).scale(amount / TRANSLATION_DIVISOR),
        };
        match channel {
            Channel::IndexFlex
            | Channel::MiddleFlex
            | Channel::RingFlex
            | Channel::PinkyFlex
            | Channel::ThumbFlex => rotate(Axis::Z, delta * FINGER_DEGREES_PER_UNIT),
            Channel::RotateX => rotate(Axis::X, delta),
            Channel::RotateY => rotate(Axis::Y, delta),
            Channel::RotateZ => rotate(Axis::Z, delta),
            Channel::TranslateX => match self.config.translate_x {
                TranslateXPolicy::Delta => translate(Axis::X, delta),
                TranslateXPolicy::Absolute => translate(Axis::X, value),
            },
            Channel::TranslateY => translate(Axis::Y, delta),
            Channel::TranslateZ => translate(Axis::Z, delta),
        }
    }
}

fn apply_to_target(
    rig: &mut dyn RigSink,
    target: &str,
    update: TransformUpdate,
) -> Result<(), HandError> {
    let mut pose = rig.pose(target).ok_or_else(|| HandError::Scene {
        target: target.to_string(),
        details: "rig target not found".to_string(),
    })?;
    match update {
        TransformUpdate::Rotate { axis, degrees } => pose.rotate_local(axis, degrees),
        TransformUpdate::Translate { offset } => pose.translate_local(offset),
    }
    rig.set_pose(target, pose)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
