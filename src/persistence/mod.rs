//! Player progress persistence
//!
//! The completed-levels list is read once at startup and written back on
//! every change. The interstitial bookkeeping lives under its own key.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::platform::KeyValueStore;

/// Storage key for the completed-levels list
pub const COMPLETED_LEVELS_KEY: &str = "chronocrafters_completed_levels";
/// Storage key for the catalog index the last interstitial ran at
pub const LAST_INTERSTITIAL_KEY: &str = "chronocrafters_last_interstitial_level";

/// Ids of completed levels, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Progress {
    completed: Vec<String>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load progress from the store; unreadable data starts fresh
    pub fn load(store: &impl KeyValueStore) -> Self {
        match store.get(COMPLETED_LEVELS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Progress>(&json) {
                Ok(progress) => {
                    log::info!("Loaded {} completed levels", progress.completed.len());
                    return progress;
                }
                Err(e) => log::warn!("Discarding unreadable progress: {e}"),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read progress: {e}"),
        }

        log::info!("No progress found, starting fresh");
        Self::new()
    }

    pub fn save(&self, store: &mut impl KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        store.set(COMPLETED_LEVELS_KEY, &json)?;
        log::info!("Progress saved ({} completed)", self.completed.len());
        Ok(())
    }

    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    pub fn is_completed(&self, level_id: &str) -> bool {
        self.completed.iter().any(|id| id == level_id)
    }

    /// Record a completion; writes only when the list changed
    pub fn mark_completed(
        &mut self,
        level_id: &str,
        store: &mut impl KeyValueStore,
    ) -> Result<bool> {
        if self.is_completed(level_id) {
            return Ok(false);
        }
        self.completed.push(level_id.to_string());
        self.save(store)?;
        Ok(true)
    }
}

/// Catalog index of the level the last interstitial was shown before
pub fn last_interstitial(store: &impl KeyValueStore) -> usize {
    store
        .get(LAST_INTERSTITIAL_KEY)
        .ok()
        .flatten()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

pub fn set_last_interstitial(store: &mut impl KeyValueStore, index: usize) -> Result<()> {
    store.set(LAST_INTERSTITIAL_KEY, &index.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_mark_completed_writes_once() {
        let mut store = MemoryStore::default();
        let mut progress = Progress::load(&store);
        assert!(progress.completed().is_empty());

        assert!(progress.mark_completed("level-1", &mut store).unwrap());
        assert!(!progress.mark_completed("level-1", &mut store).unwrap());
        assert_eq!(
            store.get(COMPLETED_LEVELS_KEY).unwrap().as_deref(),
            Some(r#"["level-1"]"#)
        );

        let reloaded = Progress::load(&store);
        assert!(reloaded.is_completed("level-1"));
        assert!(!reloaded.is_completed("level-2"));
    }

    #[test]
    fn test_corrupt_progress_starts_fresh() {
        let mut store = MemoryStore::default();
        store.set(COMPLETED_LEVELS_KEY, "{oops").unwrap();
        assert_eq!(Progress::load(&store), Progress::new());
    }

    #[test]
    fn test_last_interstitial_defaults_to_zero() {
        let mut store = MemoryStore::default();
        assert_eq!(last_interstitial(&store), 0);
        set_last_interstitial(&mut store, 3).unwrap();
        assert_eq!(last_interstitial(&store), 3);
    }
}
