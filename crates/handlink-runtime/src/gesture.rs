//! [`GestureEngine`] – fires scene actions from hand poses.
//!
//! Evaluated once per simulation tick, after every record of the tick has
//! been applied to the [`ChannelState`].  Rules run in a fixed order and each
//! is independent of the others:
//!
//! | # | Rule | Predicate | Action |
//! |---|---|---|---|
//! | 1 | `spawn_ring` | Ring > 40 | spawn at (−1, 2, 4) |
//! | 2 | `spawn_index` | Index > 40 | spawn at (1, 2, 4) |
//! | 3 | `spawn_middle` | Middle > 40 | spawn at (0, 2, 4) |
//! | 4 | `clear` | Middle, Index, Ring, Thumb all > 60 | destroy every tracked object |
//! | 5 | `lift` | RotateZ > 20 | impulse (0, 30, 0) on every tracked object |
//!
//! Because rules 1–3 run before rule 4, a fist both spawns three objects and
//! then clears them (along with everything else) in the same tick.
//!
//! In [`TriggerMode::Level`] a rule fires on every tick its predicate holds.
//! In [`TriggerMode::Edge`] it fires only on the tick the predicate becomes
//! true.

use std::fmt;
use std::str::FromStr;

use handlink_hal::{ObjectRegistry, SceneSink};
use handlink_rig::Vec3;
use handlink_types::{Channel, ObjectId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::mapper::ChannelState;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    #[default]
    Level,
    Edge,
}

impl FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "level" => Ok(TriggerMode::Level),
            "edge" => Ok(TriggerMode::Edge),
            other => Err(format!("unknown trigger mode '{other}' (expected level or edge)")),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerMode::Level => "level",
            TriggerMode::Edge => "edge",
        })
    }
}

/// Tunables for the built-in rule set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub trigger_mode: TriggerMode,
    /// Flex above which a single finger spawns an object.
    pub spawn_threshold: f32,
    /// Flex every non-pinky finger must exceed to clear the scene.
    pub clear_threshold: f32,
    /// RotateZ above which tracked objects are lifted.
    pub lift_threshold: f32,
    pub ring_offset: Vec3,
    pub index_offset: Vec3,
    pub middle_offset: Vec3,
    pub lift_force: Vec3,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            trigger_mode: TriggerMode::Level,
            spawn_threshold: 40.0,
            clear_threshold: 60.0,
            lift_threshold: 20.0,
            ring_offset: Vec3::new(-1.0, 2.0, 4.0),
            index_offset: Vec3::new(1.0, 2.0, 4.0),
            middle_offset: Vec3::new(0.0, 2.0, 4.0),
            lift_force: Vec3::new(0.0, 30.0, 0.0),
        }
    }
}

impl GestureConfig {
    /// The built-in rules, in evaluation order.
    pub fn rules(&self) -> Vec<GestureRule> {
        let spawn = |name, channel, offset| GestureRule {
            name,
            predicate: Predicate::Above {
                channel,
                threshold: self.spawn_threshold,
            },
            action: Action::Spawn { offset },
        };
        vec![
            spawn("spawn_ring", Channel::RingFlex, self.ring_offset),
            spawn("spawn_index", Channel::IndexFlex, self.index_offset),
            spawn("spawn_middle", Channel::MiddleFlex, self.middle_offset),
            GestureRule {
                name: "clear",
                predicate: Predicate::AllAbove {
                    channels: vec![
                        Channel::MiddleFlex,
                        Channel::IndexFlex,
                        Channel::RingFlex,
                        Channel::ThumbFlex,
                    ],
                    threshold: self.clear_threshold,
                },
                action: Action::ClearAll,
            },
            GestureRule {
                name: "lift",
                predicate: Predicate::Above {
                    channel: Channel::RotateZ,
                    threshold: self.lift_threshold,
                },
                action: Action::ImpulseAll {
                    force: self.lift_force,
                },
            },
        ]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

/// Condition over the current [`ChannelState`].  Comparisons are strict.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Above { channel: Channel, threshold: f32 },
    AllAbove { channels: Vec<Channel>, threshold: f32 },
}

impl Predicate {
    pub fn holds(&self, state: &ChannelState) -> bool {
        match self {
            Predicate::Above { channel, threshold } => state.get(*channel) > *threshold,
            Predicate::AllAbove { channels, threshold } => {
                channels.iter().all(|c| state.get(*c) > *threshold)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Spawn one object at a fixed world position and start tracking it.
    Spawn { offset: Vec3 },
    /// Destroy and forget every tracked object.
    ClearAll,
    /// Apply `force` to every tracked object.
    ImpulseAll { force: Vec3 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureRule {
    pub name: &'static str,
    pub predicate: Predicate,
    pub action: Action,
}

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// Result of one fired rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Spawned(ObjectId),
    /// The scene refused to spawn; nothing was tracked.
    SpawnFailed,
    Cleared(usize),
    Pushed(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub rule: &'static str,
    pub outcome: Outcome,
}

/// Everything that fired during one evaluation, in rule order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureReport {
    pub fired: Vec<Firing>,
}

impl GestureReport {
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.fired.iter().map(|f| f.rule).collect()
    }

    pub fn spawned(&self) -> Vec<ObjectId> {
        self.fired
            .iter()
            .filter_map(|f| match f.outcome {
                Outcome::Spawned(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

pub struct GestureEngine {
    rules: Vec<GestureRule>,
    mode: TriggerMode,
    /// Predicate value per rule at the previous evaluation.
    previous: Vec<bool>,
}

impl GestureEngine {
    pub fn new(config: &GestureConfig) -> Self {
        Self::with_rules(config.rules(), config.trigger_mode)
    }

    pub fn with_rules(rules: Vec<GestureRule>, mode: TriggerMode) -> Self {
        let previous = vec![false; rules.len()];
        Self {
            rules,
            mode,
            previous,
        }
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    pub fn rules(&self) -> &[GestureRule] {
        &self.rules
    }

    /// Forget edge history so every currently-true predicate fires again on
    /// the next evaluation.
    pub fn reset(&mut self) {
        self.previous.fill(false);
    }

    /// Run every rule once against `state`.
    pub fn evaluate(
        &mut self,
        state: &ChannelState,
        registry: &mut ObjectRegistry,
        scene: &mut dyn SceneSink,
    ) -> GestureReport {
        let mut report = GestureReport::default();

        for (rule, was_true) in self.rules.iter().zip(self.previous.iter_mut()) {
            let is_true = rule.predicate.holds(state);
            let fire = match self.mode {
                TriggerMode::Level => is_true,
                TriggerMode::Edge => is_true && !*was_true,
            };
            *was_true = is_true;
            if !fire {
                continue;
            }

            let outcome = match rule.action {
                Action::Spawn { offset } => match scene.spawn(offset) {
                    Ok(object) => {
                        registry.add(object);
                        Outcome::Spawned(object)
                    }
                    Err(e) => {
                        warn!(rule = rule.name, error = %e, "spawn failed");
                        Outcome::SpawnFailed
                    }
                },
                Action::ClearAll => {
                    let destroyed = registry.clear(scene);
                    info!(rule = rule.name, destroyed, "scene cleared");
                    Outcome::Cleared(destroyed)
                }
                Action::ImpulseAll { force } => {
                    Outcome::Pushed(registry.apply_force_all(scene, force))
                }
            };
            debug!(rule = rule.name, ?outcome, "gesture fired");
            report.fired.push(Firing {
                rule: rule.name,
                outcome,
            });
        }

        report
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
