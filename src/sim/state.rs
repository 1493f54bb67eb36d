//! Simulated objects and the time-control policy
//!
//! Everything a snapshot captures lives here. Objects carry a typed variant
//! per kind instead of a free-form property bag.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::RIPE_THRESHOLD;

/// How an object reacts to the global time policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeAffinity {
    /// Follows global speed and direction
    #[default]
    Dimension,
    /// Runs on its own fixed forward clock, immune to the policy
    #[serde(rename = "self")]
    Own,
}

/// Kind-specific object state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ObjectKind {
    /// Scenery; `ground` marks the floor falling objects land on
    Static {
        #[serde(default)]
        ground: bool,
    },
    /// Falling objects and moving platforms
    Movable {
        #[serde(default)]
        falling: bool,
        /// Landing on the ground shatters it and fails the level
        #[serde(default)]
        fragile: bool,
        /// One-way latch, cleared only by a level reset
        #[serde(default)]
        shattered: bool,
        /// Platform destination; `None` for objects that don't move on their own
        #[serde(default)]
        target_y: Option<f32>,
    },
    /// Grows over time
    Plant {
        /// Always within [0, 1]
        growth_stage: f32,
        #[serde(default)]
        ripe: bool,
    },
    /// Pressed by the player
    Button {
        #[serde(default)]
        pressed: bool,
        /// Simulated time of the press, -1 when not pressed
        #[serde(default = "unpressed_time")]
        press_time: f32,
    },
}

fn unpressed_time() -> f32 {
    -1.0
}

/// A single simulated entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameObject {
    pub id: String,
    pub kind: ObjectKind,
    /// Top-left corner, y grows downward
    pub pos: Vec2,
    /// Width and height
    pub size: Vec2,
    #[serde(default)]
    pub time_affinity: TimeAffinity,
}

impl GameObject {
    pub fn new(id: impl Into<String>, kind: ObjectKind, pos: Vec2, size: Vec2) -> Self {
        Self {
            id: id.into(),
            kind,
            pos,
            size,
            time_affinity: TimeAffinity::Dimension,
        }
    }

    /// Inert scenery
    pub fn scenery(id: impl Into<String>, pos: Vec2, size: Vec2) -> Self {
        Self::new(id, ObjectKind::Static { ground: false }, pos, size)
    }

    /// The floor falling objects come to rest on
    pub fn ground(id: impl Into<String>, pos: Vec2, size: Vec2) -> Self {
        Self::new(id, ObjectKind::Static { ground: true }, pos, size)
    }

    pub fn plant(id: impl Into<String>, pos: Vec2, size: Vec2, growth_stage: f32) -> Self {
        let growth_stage = growth_stage.clamp(0.0, 1.0);
        Self::new(
            id,
            ObjectKind::Plant {
                growth_stage,
                ripe: growth_stage >= RIPE_THRESHOLD,
            },
            pos,
            size,
        )
    }

    /// A falling movable; `fragile` ones shatter on landing
    pub fn falling(id: impl Into<String>, pos: Vec2, size: Vec2, fragile: bool) -> Self {
        Self::new(
            id,
            ObjectKind::Movable {
                falling: true,
                fragile,
                shattered: false,
                target_y: None,
            },
            pos,
            size,
        )
    }

    /// A movable that travels toward `target_y`
    pub fn platform(id: impl Into<String>, pos: Vec2, size: Vec2, target_y: f32) -> Self {
        Self::new(
            id,
            ObjectKind::Movable {
                falling: false,
                fragile: false,
                shattered: false,
                target_y: Some(target_y),
            },
            pos,
            size,
        )
    }

    pub fn button(id: impl Into<String>, pos: Vec2, size: Vec2) -> Self {
        Self::new(
            id,
            ObjectKind::Button {
                pressed: false,
                press_time: unpressed_time(),
            },
            pos,
            size,
        )
    }

    /// Switch the object to its own clock
    pub fn with_own_clock(mut self) -> Self {
        self.time_affinity = TimeAffinity::Own;
        self
    }

    pub fn growth_stage(&self) -> Option<f32> {
        match self.kind {
            ObjectKind::Plant { growth_stage, .. } => Some(growth_stage),
            _ => None,
        }
    }

    pub fn is_shattered(&self) -> bool {
        matches!(self.kind, ObjectKind::Movable { shattered: true, .. })
    }

    pub fn is_ground(&self) -> bool {
        matches!(self.kind, ObjectKind::Static { ground: true })
    }

    /// Press time if this is a pressed button
    pub fn press_time(&self) -> Option<f32> {
        match self.kind {
            ObjectKind::Button {
                pressed: true,
                press_time,
            } => Some(press_time),
            _ => None,
        }
    }

    /// Whether the player can freeze this object individually
    pub fn is_pausable(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Movable { .. } | ObjectKind::Plant { .. }
        )
    }
}

/// Look up an object by id
pub fn find<'a>(objects: &'a [GameObject], id: &str) -> Option<&'a GameObject> {
    objects.iter().find(|o| o.id == id)
}

/// Direction simulated time flows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Time controls a level may expose to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Control {
    GlobalSpeed,
    Direction,
    PauseObject,
}

/// Global time-control policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeControl {
    /// Non-negative multiplier; 0 freezes the level
    pub global_speed: f32,
    pub direction: Direction,
    /// Objects exempt from updates
    pub paused: BTreeSet<String>,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            global_speed: 1.0,
            direction: Direction::Forward,
            paused: BTreeSet::new(),
        }
    }
}

impl TimeControl {
    /// Whether a tick under this policy changes nothing
    pub fn is_frozen(&self) -> bool {
        self.global_speed == 0.0
    }

    /// Wall-clock delta scaled by speed, negated under reverse
    pub fn effective_delta(&self, wall_dt: f32) -> f32 {
        let delta = wall_dt * self.global_speed;
        match self.direction {
            Direction::Forward => delta,
            Direction::Reverse => -delta,
        }
    }

    pub fn is_paused(&self, id: &str) -> bool {
        self.paused.contains(id)
    }

    /// Flip the pause state of an object; returns true if it is now paused
    pub fn toggle_paused(&mut self, id: &str) -> bool {
        if self.paused.remove(id) {
            false
        } else {
            self.paused.insert(id.to_string());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_delta_sign() {
        let mut policy = TimeControl {
            global_speed: 2.0,
            ..Default::default()
        };
        assert_eq!(policy.effective_delta(0.5), 1.0);

        policy.direction = Direction::Reverse;
        assert_eq!(policy.effective_delta(0.5), -1.0);
    }

    #[test]
    fn test_toggle_paused() {
        let mut policy = TimeControl::default();
        assert!(policy.toggle_paused("vase"));
        assert!(policy.is_paused("vase"));
        assert!(!policy.toggle_paused("vase"));
        assert!(!policy.is_paused("vase"));
    }

    #[test]
    fn test_plant_constructor_clamps_and_marks_ripe() {
        let plant = GameObject::plant("apple", Vec2::ZERO, Vec2::splat(30.0), 1.4);
        assert_eq!(plant.growth_stage(), Some(1.0));
        assert!(matches!(plant.kind, ObjectKind::Plant { ripe: true, .. }));
    }

    #[test]
    fn test_object_json_shape() {
        let json = r#"{
            "id": "button-B",
            "kind": { "type": "button" },
            "pos": [220.0, 150.0],
            "size": [40.0, 20.0],
            "timeAffinity": "self"
        }"#;
        let obj: GameObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.time_affinity, TimeAffinity::Own);
        assert_eq!(
            obj.kind,
            ObjectKind::Button {
                pressed: false,
                press_time: -1.0
            }
        );

        let vase = r#"{
            "id": "vase",
            "kind": { "type": "movable", "falling": true, "fragile": true },
            "pos": [150.0, 50.0],
            "size": [20.0, 40.0]
        }"#;
        let obj: GameObject = serde_json::from_str(vase).unwrap();
        assert_eq!(obj.time_affinity, TimeAffinity::Dimension);
        assert!(matches!(
            obj.kind,
            ObjectKind::Movable {
                falling: true,
                fragile: true,
                shattered: false,
                target_y: None
            }
        ));
    }
}
