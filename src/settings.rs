//! Engine settings
//!
//! Tunables for history, rewind and frame pacing. Persisted alongside
//! progress in the key-value store; anything missing or invalid falls back
//! to the defaults.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_HISTORY_SNAPSHOTS;
use crate::error::{Error, Result};
use crate::platform::KeyValueStore;

/// Session tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // === History ===
    /// Simulated seconds between rewind snapshots
    pub snapshot_interval: f32,
    /// Simulated seconds of history kept for rewinding
    pub max_history_seconds: f32,

    // === Rewind ===
    /// How far back a rewind request reaches (simulated seconds)
    pub rewind_seconds: f32,
    /// Wall-clock pause after a successful rewind before ticking resumes
    pub rewind_pause_seconds: f32,

    // === Frame pacing ===
    /// Upper bound on the wall-clock delta of a single frame
    pub max_frame_delta: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_interval: 0.2,
            max_history_seconds: 60.0,
            rewind_seconds: 5.0,
            rewind_pause_seconds: 0.3,
            max_frame_delta: 0.1,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "chronocrafters_settings";

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the session can't work with
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &'static str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidSetting {
                    name,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }
        fn non_negative(name: &'static str, value: f32) -> Result<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidSetting {
                    name,
                    reason: format!("must be zero or more, got {value}"),
                })
            }
        }

        positive("snapshotInterval", self.snapshot_interval)?;
        positive("maxHistorySeconds", self.max_history_seconds)?;
        positive("maxFrameDelta", self.max_frame_delta)?;
        non_negative("rewindSeconds", self.rewind_seconds)?;
        non_negative("rewindPauseSeconds", self.rewind_pause_seconds)?;

        let snapshots = self.max_history_seconds / self.snapshot_interval;
        if snapshots > MAX_HISTORY_SNAPSHOTS as f32 {
            return Err(Error::InvalidSetting {
                name: "maxHistorySeconds",
                reason: format!(
                    "needs {snapshots:.0} snapshots, at most {MAX_HISTORY_SNAPSHOTS} allowed"
                ),
            });
        }
        Ok(())
    }

    /// Load settings from the store, falling back to defaults
    pub fn load(store: &impl KeyValueStore) -> Self {
        match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from storage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring stored settings: {e}"),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings: {e}"),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to the store
    pub fn save(&self, store: &mut impl KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "rewindSeconds": 2.5 }"#).unwrap();
        assert_eq!(settings.rewind_seconds, 2.5);
        assert_eq!(settings.snapshot_interval, 0.2);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = Settings::from_json(r#"{ "snapshotInterval": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSetting {
                name: "snapshotInterval",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_oversized_history() {
        let err = Settings::from_json(r#"{ "maxHistorySeconds": 1e30 }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSetting {
                name: "maxHistorySeconds",
                ..
            }
        ));
        // 2000 seconds at 0.2s is exactly the limit
        assert!(Settings::from_json(r#"{ "maxHistorySeconds": 2000.0 }"#).is_ok());
    }

    #[test]
    fn test_load_falls_back_on_garbage() {
        let mut store = MemoryStore::default();
        store.set(Settings::STORAGE_KEY, "not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let mut store = MemoryStore::default();
        let settings = Settings {
            rewind_pause_seconds: 0.0,
            ..Default::default()
        };
        settings.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), settings);
    }
}
