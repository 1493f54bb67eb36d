//! Application shell
//!
//! Owns the catalog, persisted progress and the active session. Frontends
//! call into `App` for navigation and forward the session's events through
//! `process_events` so completions get saved.

use crate::ads::{AdGate, InterstitialPolicy};
use crate::error::{Error, Result};
use crate::hint::{self, HintGenerator};
use crate::levels::LevelCatalog;
use crate::persistence::{self, Progress};
use crate::platform::KeyValueStore;
use crate::session::{Session, SessionEvent};
use crate::settings::Settings;

/// Top-level game state
pub struct App<S: KeyValueStore> {
    catalog: LevelCatalog,
    settings: Settings,
    store: S,
    progress: Progress,
    interstitial: InterstitialPolicy,
    session: Option<Session>,
}

impl<S: KeyValueStore> App<S> {
    /// Load settings and progress from `store`
    pub fn new(catalog: LevelCatalog, store: S) -> Self {
        let settings = Settings::load(&store);
        let progress = Progress::load(&store);
        log::info!("{} levels available", catalog.len());
        Self {
            catalog,
            settings,
            store,
            progress,
            interstitial: InterstitialPolicy::default(),
            session: None,
        }
    }

    pub fn with_interstitial(mut self, policy: InterstitialPolicy) -> Self {
        self.interstitial = policy;
        self
    }

    // === Accessors ===

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    // === Navigation ===

    /// Check the interstitial cap for level `id`
    ///
    /// Returns true when an interstitial must run before the level; the
    /// level index is recorded as the last interstitial position.
    pub fn begin_selection(&mut self, id: &str) -> Result<bool> {
        let index = self
            .catalog
            .index_of(id)
            .ok_or_else(|| Error::UnknownLevel(id.to_string()))?;
        let last = persistence::last_interstitial(&self.store);
        if !self.interstitial.is_due(index, last) {
            return Ok(false);
        }
        persistence::set_last_interstitial(&mut self.store, index)?;
        log::info!("Interstitial due before level {id}");
        Ok(true)
    }

    /// Open level `id` in the idle phase
    pub fn enter_level(&mut self, id: &str) -> Result<&mut Session> {
        let level = self
            .catalog
            .find_by_id(id)
            .cloned()
            .ok_or_else(|| Error::UnknownLevel(id.to_string()))?;
        log::info!("Entering level {} ({})", level.id, level.name);
        Ok(self.session.insert(Session::new(level, &self.settings)))
    }

    /// Select a level, running the interstitial gate when it is due
    pub async fn select_level(&mut self, id: &str, ads: &impl AdGate) -> Result<&mut Session> {
        if self.begin_selection(id)? {
            ads.interstitial().await;
        }
        self.enter_level(id)
    }

    /// Restart the current level
    pub fn replay(&mut self) -> Option<&mut Session> {
        let session = self.session.as_mut()?;
        session.start();
        Some(session)
    }

    /// Id of the level after the current one
    pub fn next_level_id(&self) -> Option<String> {
        let current = self.session.as_ref()?;
        self.catalog
            .next_after(&current.level().id)
            .map(|level| level.id.clone())
    }

    /// Move to the following level; false on the last one
    pub async fn next_level(&mut self, ads: &impl AdGate) -> Result<bool> {
        let Some(id) = self.next_level_id() else {
            return Ok(false);
        };
        self.select_level(&id, ads).await?;
        Ok(true)
    }

    /// Leave the current level for the selection screen
    pub fn back_to_select(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
        self.session = None;
    }

    // === Events ===

    /// Drain session events, persisting completions
    pub fn process_events(&mut self) -> Vec<SessionEvent> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let events = session.drain_events();
        for event in &events {
            if let SessionEvent::Won(result) = event {
                match self.progress.mark_completed(&result.level_id, &mut self.store) {
                    Ok(true) => log::info!("Level {} marked complete", result.level_id),
                    Ok(false) => {}
                    Err(e) => log::warn!("Failed to save progress: {e}"),
                }
            }
        }
        events
    }

    // === Hints ===

    /// Hint for the current session, or the fallback text
    pub async fn request_hint(&self, ads: &impl AdGate, generator: &impl HintGenerator) -> String {
        hint::request_hint(ads, generator, || match self.session.as_ref() {
            Some(session) => hint::build_prompt(session),
            None => Err(crate::error::HintError::MissingPrompt),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::PassThroughGate;
    use crate::hint::FALLBACK_HINT;
    use crate::persistence::{COMPLETED_LEVELS_KEY, LAST_INTERSTITIAL_KEY};
    use crate::platform::MemoryStore;
    use crate::session::Phase;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingGate {
        interstitials: Cell<u32>,
    }

    impl AdGate for CountingGate {
        async fn rewarded(&self) {}

        async fn interstitial(&self) {
            self.interstitials.set(self.interstitials.get() + 1);
        }
    }

    fn app() -> App<MemoryStore> {
        App::new(LevelCatalog::builtin(), MemoryStore::default())
    }

    #[test]
    fn test_completion_is_persisted() {
        let mut app = app();
        let session = app.enter_level("level-1").unwrap();
        session.start();
        for _ in 0..100 {
            session.tick(0.1);
        }
        assert_eq!(session.phase(), Phase::Won);

        let events = app.process_events();
        assert!(events.iter().any(|e| matches!(e, SessionEvent::Won(_))));
        assert!(app.progress().is_completed("level-1"));
        assert_eq!(
            app.store().get(COMPLETED_LEVELS_KEY).unwrap().as_deref(),
            Some(r#"["level-1"]"#)
        );
    }

    #[test]
    fn test_progress_survives_restart() {
        let mut store = MemoryStore::default();
        store.set(COMPLETED_LEVELS_KEY, r#"["level-2"]"#).unwrap();
        let app = App::new(LevelCatalog::builtin(), store);
        assert!(app.progress().is_completed("level-2"));
    }

    #[test]
    fn test_unknown_level() {
        let mut app = app();
        assert!(matches!(
            app.enter_level("level-42"),
            Err(Error::UnknownLevel(_))
        ));
        assert!(app.begin_selection("level-42").is_err());
    }

    #[test]
    fn test_interstitial_frequency_cap() {
        let mut app = app().with_interstitial(InterstitialPolicy { frequency_cap: 2 });
        assert!(!app.begin_selection("level-1").unwrap());
        assert!(!app.begin_selection("level-2").unwrap());
        assert!(app.begin_selection("level-3").unwrap());
        assert_eq!(
            app.store().get(LAST_INTERSTITIAL_KEY).unwrap().as_deref(),
            Some("2")
        );
        assert!(!app.begin_selection("level-3").unwrap());
    }

    #[test]
    fn test_back_to_select_drops_session() {
        let mut app = app();
        app.enter_level("level-2").unwrap().start();
        app.back_to_select();
        assert!(app.session().is_none());
        assert!(app.replay().is_none());
    }

    #[tokio::test]
    async fn test_next_level_runs_gate() {
        let gate = CountingGate::default();
        let mut app = app().with_interstitial(InterstitialPolicy { frequency_cap: 1 });

        app.select_level("level-1", &gate).await.unwrap();
        assert_eq!(gate.interstitials.get(), 0);
        assert!(app.next_level(&gate).await.unwrap());
        assert_eq!(app.session().unwrap().level().id, "level-2");
        assert_eq!(gate.interstitials.get(), 1);

        assert!(app.next_level(&gate).await.unwrap());
        assert!(!app.next_level(&gate).await.unwrap());
        assert_eq!(app.session().unwrap().level().id, "level-3");
        assert_eq!(app.session().unwrap().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_hint_without_session_falls_back() {
        let app = app();
        let hint = app.request_hint(&PassThroughGate, &crate::hint::Offline).await;
        assert_eq!(hint, FALLBACK_HINT);
    }
}
