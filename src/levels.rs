//! Level catalog
//!
//! An ordered, immutable list of levels. The built-in catalog ships the
//! three original puzzles; other catalogs can be loaded from JSON.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use glam::Vec2;

use crate::error::{Error, Result};
use crate::sim::{Control, GameObject, Level, WinCondition};

/// Ordered level list
#[derive(Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<Arc<Level>>,
}

impl LevelCatalog {
    /// Build a catalog, validating every level and id uniqueness
    pub fn new(mut levels: Vec<Level>) -> Result<Self> {
        let mut ids = HashSet::new();
        for level in &mut levels {
            level.validate()?;
            level.normalize();
            if !ids.insert(level.id.clone()) {
                return Err(Error::InvalidLevel {
                    id: level.id.clone(),
                    reason: "duplicate level id".to_string(),
                });
            }
        }
        Ok(Self {
            levels: levels.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a JSON array of levels
    pub fn from_json(json: &str) -> Result<Self> {
        let levels: Vec<Level> = serde_json::from_str(json)?;
        Self::new(levels)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Level>> {
        self.levels.iter()
    }

    pub fn first(&self) -> Option<&Arc<Level>> {
        self.levels.first()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Arc<Level>> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.levels.iter().position(|l| l.id == id)
    }

    /// The level following `id`, if any
    pub fn next_after(&self, id: &str) -> Option<&Arc<Level>> {
        self.index_of(id).and_then(|i| self.levels.get(i + 1))
    }

    /// The three shipped puzzles
    pub fn builtin() -> Self {
        Self {
            levels: vec![
                Arc::new(clockwork_orchard()),
                Arc::new(temporal_toggles()),
                Arc::new(reversal_river()),
            ],
        }
    }
}

fn controls(list: &[Control]) -> BTreeSet<Control> {
    list.iter().copied().collect()
}

fn clockwork_orchard() -> Level {
    Level {
        id: "level-1".to_string(),
        name: "The Clockwork Orchard".to_string(),
        description: "A small garden where fruits ripen at different speeds. \
                      Get all apples to full ripeness simultaneously."
            .to_string(),
        goal: "Make all apples ripe at the same time.".to_string(),
        initial_state: vec![
            GameObject::plant("apple-1", Vec2::new(50.0, 150.0), Vec2::splat(30.0), 0.2),
            GameObject::plant("apple-2", Vec2::new(150.0, 100.0), Vec2::splat(30.0), 0.5),
            GameObject::plant("apple-3", Vec2::new(250.0, 200.0), Vec2::splat(30.0), 0.8),
        ],
        controls: controls(&[Control::GlobalSpeed]),
        win: WinCondition::AllRipe {
            id_prefix: "apple".to_string(),
        },
        hint_prompt: Some(
            "The player is on Level 1, 'The Clockwork Orchard'. The goal is to make all \
             apples ripe at the same time. Apples are at growth stages 0.2, 0.5, and 0.8. \
             The only control is 'globalSpeed'. Provide a short, actionable hint."
                .to_string(),
        ),
        rewind_charges: 3,
    }
}

fn temporal_toggles() -> Level {
    Level {
        id: "level-2".to_string(),
        name: "Temporal Toggles".to_string(),
        description: "Two buttons need to be pressed in quick succession, but they operate \
                      on different time flows. Use pause and global speed to sync them."
            .to_string(),
        goal: "Press both buttons within 0.1 seconds of each other.".to_string(),
        initial_state: vec![
            GameObject::button("button-A", Vec2::new(80.0, 150.0), Vec2::new(40.0, 20.0)),
            GameObject::button("button-B", Vec2::new(220.0, 150.0), Vec2::new(40.0, 20.0))
                .with_own_clock(),
            GameObject::scenery("barrier", Vec2::new(150.0, 100.0), Vec2::new(10.0, 100.0)),
        ],
        controls: controls(&[Control::GlobalSpeed, Control::PauseObject]),
        win: WinCondition::PressedTogether {
            first: "button-A".to_string(),
            second: "button-B".to_string(),
            within: 0.1,
        },
        hint_prompt: Some(
            "The player is on Level 2, 'Temporal Toggles'. The goal is to press two buttons \
             within 0.1 seconds. Button A reacts to global speed, Button B has its own fast \
             internal timer. Controls are 'globalSpeed' and 'pauseObject'. Provide a short, \
             actionable hint."
                .to_string(),
        ),
        rewind_charges: 3,
    }
}

fn reversal_river() -> Level {
    Level {
        id: "level-3".to_string(),
        name: "Reversal River".to_string(),
        description: "A delicate vase is about to fall. Use time reversal to catch it \
                      before it shatters."
            .to_string(),
        goal: "Prevent the vase from breaking by reversing time and moving a platform into place."
            .to_string(),
        initial_state: vec![
            GameObject::falling("vase", Vec2::new(150.0, 50.0), Vec2::new(20.0, 40.0), true),
            GameObject::platform("platform", Vec2::new(100.0, 250.0), Vec2::new(80.0, 10.0), 100.0)
                .with_own_clock(),
            GameObject::ground("ground", Vec2::new(0.0, 280.0), Vec2::new(300.0, 20.0)),
        ],
        controls: controls(&[Control::GlobalSpeed, Control::Direction]),
        win: WinCondition::Supported {
            object: "vase".to_string(),
            platform: "platform".to_string(),
            min_y: 100.0,
            max_y: 280.0,
        },
        hint_prompt: Some(
            "The player is on Level 3, 'Reversal River'. The goal is to prevent a falling vase \
             from breaking. The player can reverse time and move a platform. The vase is falling \
             from y=50 towards y=280 (ground). A platform needs to be positioned under it. \
             Provide a short, actionable hint."
                .to_string(),
        ),
        rewind_charges: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::settings::Settings;
    use crate::sim::ObjectKind;

    #[test]
    fn test_builtin_levels_are_valid() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        for level in catalog.iter() {
            level.validate().unwrap();
        }
    }

    #[test]
    fn test_lookup_and_next() {
        let catalog = LevelCatalog::builtin();
        assert_eq!(catalog.index_of("level-2"), Some(1));
        assert_eq!(catalog.next_after("level-1").map(|l| l.id.as_str()), Some("level-2"));
        assert!(catalog.next_after("level-3").is_none());
        assert!(catalog.next_after("nope").is_none());
        assert!(catalog.find_by_id("level-9").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{
            "id": "garden",
            "name": "Garden",
            "description": "One apple",
            "goal": "Ripen it",
            "initialState": [{
                "id": "apple",
                "kind": { "type": "plant", "growthStage": 0.9 },
                "pos": [0.0, 0.0],
                "size": [30.0, 30.0]
            }],
            "controls": ["globalSpeed", "direction"],
            "win": { "type": "allRipe", "idPrefix": "apple" }
        }]"#;
        let catalog = LevelCatalog::from_json(json).unwrap();
        let level = catalog.find_by_id("garden").unwrap();
        assert!(level.allows(Control::Direction));
        assert!(!level.allows(Control::PauseObject));
        assert_eq!(level.rewind_charges, crate::consts::DEFAULT_REWIND_CHARGES);
        assert!(level.hint_prompt.is_none());
    }

    fn garden(stage: &str) -> String {
        format!(
            r#"[{{
                "id": "garden",
                "name": "", "description": "", "goal": "",
                "initialState": [{{
                    "id": "apple",
                    "kind": {{ "type": "plant", "growthStage": {stage} }},
                    "pos": [0.0, 0.0],
                    "size": [30.0, 30.0]
                }}],
                "controls": [],
                "win": {{ "type": "allRipe", "idPrefix": "apple" }}
            }}]"#
        )
    }

    #[test]
    fn test_from_json_rejects_growth_outside_unit_range() {
        for stage in ["5.0", "-0.5"] {
            assert!(matches!(
                LevelCatalog::from_json(&garden(stage)),
                Err(Error::InvalidLevel { .. })
            ));
        }
    }

    #[test]
    fn test_from_json_derives_ripeness() {
        let catalog = LevelCatalog::from_json(&garden("1.0")).unwrap();
        let level = catalog.find_by_id("garden").unwrap();
        assert!(matches!(
            level.initial_state[0].kind,
            ObjectKind::Plant { ripe: true, .. }
        ));

        let mut session = Session::new(level.clone(), &Settings::default());
        session.start();
        let stage = session.objects()[0].growth_stage().unwrap();
        assert!((0.0..=1.0).contains(&stage));
    }

    #[test]
    fn test_from_json_rejects_duplicate_levels() {
        let level = r#"{
            "id": "same",
            "name": "", "description": "", "goal": "",
            "initialState": [{ "id": "w", "kind": { "type": "static" }, "pos": [0.0, 0.0], "size": [1.0, 1.0] }],
            "controls": [],
            "win": { "type": "allRipe", "idPrefix": "w" }
        }"#;
        let json = format!("[{level}, {level}]");
        assert!(matches!(
            LevelCatalog::from_json(&json),
            Err(Error::InvalidLevel { .. })
        ));
        assert!(matches!(LevelCatalog::from_json("{"), Err(Error::Json(_))));
    }
}
