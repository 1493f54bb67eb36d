//! Level definitions and win conditions
//!
//! Levels are read-only inputs shared between sessions. Win conditions are
//! declarative and total: a missing object simply means "not won".

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::state::{Control, GameObject, ObjectKind, find};
use crate::consts::{DEFAULT_REWIND_CHARGES, RIPE_THRESHOLD};
use crate::error::{Error, Result};

/// What a level needs for the player to win
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WinCondition {
    /// Every plant whose id starts with the prefix is ripe (and there is one)
    AllRipe { id_prefix: String },
    /// Both buttons pressed within `within` simulated seconds of each other
    PressedTogether {
        first: String,
        second: String,
        within: f32,
    },
    /// Object intact, inside `[min_y, max_y)`, with the platform reaching its bottom
    Supported {
        object: String,
        platform: String,
        min_y: f32,
        max_y: f32,
    },
}

impl WinCondition {
    pub fn is_met(&self, objects: &[GameObject]) -> bool {
        match self {
            WinCondition::AllRipe { id_prefix } => {
                let mut plants = objects
                    .iter()
                    .filter(|o| o.id.starts_with(id_prefix.as_str()))
                    .peekable();
                plants.peek().is_some()
                    && plants.all(|o| {
                        o.growth_stage()
                            .is_some_and(|stage| stage >= RIPE_THRESHOLD)
                    })
            }
            WinCondition::PressedTogether {
                first,
                second,
                within,
            } => {
                let first = find(objects, first).and_then(GameObject::press_time);
                let second = find(objects, second).and_then(GameObject::press_time);
                match (first, second) {
                    (Some(a), Some(b)) => (a - b).abs() <= *within,
                    _ => false,
                }
            }
            WinCondition::Supported {
                object,
                platform,
                min_y,
                max_y,
            } => {
                let (Some(object), Some(platform)) = (find(objects, object), find(objects, platform))
                else {
                    return false;
                };
                if !matches!(object.kind, ObjectKind::Movable { .. }) || object.is_shattered() {
                    return false;
                }
                let y = object.pos.y;
                y >= *min_y && y < *max_y && platform.pos.y <= y + object.size.y
            }
        }
    }
}

fn default_rewind_charges() -> u32 {
    DEFAULT_REWIND_CHARGES
}

/// A playable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Player-facing goal text
    pub goal: String,
    /// Objects every session starts from
    pub initial_state: Vec<GameObject>,
    /// Time controls the player may use
    pub controls: BTreeSet<Control>,
    pub win: WinCondition,
    /// Level-specific text handed to the hint generator
    #[serde(default)]
    pub hint_prompt: Option<String>,
    #[serde(default = "default_rewind_charges")]
    pub rewind_charges: u32,
}

impl Level {
    pub fn allows(&self, control: Control) -> bool {
        self.controls.contains(&control)
    }

    /// Reject levels that can't seed a session
    pub fn validate(&self) -> Result<()> {
        if self.initial_state.is_empty() {
            return Err(Error::InvalidLevel {
                id: self.id.clone(),
                reason: "no objects".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for obj in &self.initial_state {
            if !seen.insert(obj.id.as_str()) {
                return Err(Error::InvalidLevel {
                    id: self.id.clone(),
                    reason: format!("duplicate object id `{}`", obj.id),
                });
            }
            if let Some(stage) = obj.growth_stage().filter(|s| !(0.0..=1.0).contains(s)) {
                return Err(Error::InvalidLevel {
                    id: self.id.clone(),
                    reason: format!("`{}` has growth stage {stage} outside [0, 1]", obj.id),
                });
            }
        }
        Ok(())
    }

    /// Recompute derived object state (plant ripeness) from stored fields
    pub fn normalize(&mut self) {
        for obj in &mut self.initial_state {
            if let ObjectKind::Plant { growth_stage, ripe } = &mut obj.kind {
                *ripe = *growth_stage >= RIPE_THRESHOLD;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn pressed(id: &str, t: f32) -> GameObject {
        let mut button = GameObject::button(id, Vec2::ZERO, Vec2::new(40.0, 20.0));
        button.kind = ObjectKind::Button {
            pressed: true,
            press_time: t,
        };
        button
    }

    #[test]
    fn test_all_ripe_requires_every_plant() {
        let win = WinCondition::AllRipe {
            id_prefix: "apple".to_string(),
        };
        let mut objects = vec![
            GameObject::plant("apple-1", Vec2::ZERO, Vec2::ONE, 1.0),
            GameObject::plant("apple-2", Vec2::ZERO, Vec2::ONE, 0.5),
        ];
        assert!(!win.is_met(&objects));
        objects[1] = GameObject::plant("apple-2", Vec2::ZERO, Vec2::ONE, 0.995);
        assert!(win.is_met(&objects));
    }

    #[test]
    fn test_all_ripe_with_no_plants_is_false() {
        let win = WinCondition::AllRipe {
            id_prefix: "apple".to_string(),
        };
        assert!(!win.is_met(&[]));
        // A non-plant with the prefix never counts as ripe
        let odd = vec![GameObject::scenery("apple-crate", Vec2::ZERO, Vec2::ONE)];
        assert!(!win.is_met(&odd));
    }

    #[test]
    fn test_pressed_together_window() {
        let win = WinCondition::PressedTogether {
            first: "button-A".to_string(),
            second: "button-B".to_string(),
            within: 0.1,
        };
        assert!(win.is_met(&[pressed("button-A", 1.0), pressed("button-B", 1.05)]));
        assert!(!win.is_met(&[pressed("button-A", 1.0), pressed("button-B", 1.5)]));

        let unpressed = GameObject::button("button-B", Vec2::ZERO, Vec2::ONE);
        assert!(!win.is_met(&[pressed("button-A", 1.0), unpressed]));
        // Missing object is not a crash
        assert!(!win.is_met(&[pressed("button-A", 1.0)]));
    }

    #[test]
    fn test_supported() {
        let win = WinCondition::Supported {
            object: "vase".to_string(),
            platform: "platform".to_string(),
            min_y: 100.0,
            max_y: 280.0,
        };
        let vase = GameObject::falling("vase", Vec2::new(150.0, 120.0), Vec2::new(20.0, 40.0), true);
        let high = GameObject::platform("platform", Vec2::new(100.0, 150.0), Vec2::new(80.0, 10.0), 100.0);
        let low = GameObject::platform("platform", Vec2::new(100.0, 250.0), Vec2::new(80.0, 10.0), 100.0);

        assert!(win.is_met(&[vase.clone(), high.clone()]));
        assert!(!win.is_met(&[vase.clone(), low]));

        let mut broken = vase;
        broken.kind = ObjectKind::Movable {
            falling: false,
            fragile: true,
            shattered: true,
            target_y: None,
        };
        assert!(!win.is_met(&[broken, high]));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let level = Level {
            id: "dup".to_string(),
            name: String::new(),
            description: String::new(),
            goal: String::new(),
            initial_state: vec![
                GameObject::scenery("wall", Vec2::ZERO, Vec2::ONE),
                GameObject::scenery("wall", Vec2::ZERO, Vec2::ONE),
            ],
            controls: BTreeSet::new(),
            win: WinCondition::AllRipe {
                id_prefix: "x".to_string(),
            },
            hint_prompt: None,
            rewind_charges: 1,
        };
        assert!(matches!(level.validate(), Err(Error::InvalidLevel { .. })));
    }
}
