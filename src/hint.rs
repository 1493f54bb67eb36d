//! Hint requests
//!
//! Hints come from an external text generator. The core only builds the
//! prompt from the live session and turns every failure into a fixed
//! fallback line; nothing here can touch the simulation.

use serde::Serialize;

use crate::ads::AdGate;
use crate::error::HintError;
use crate::session::Session;
use crate::sim::{GameObject, TimeControl};

/// Framing sent ahead of every hint prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful game assistant for \"ChronoCrafters: \
    Temporal Tangle\". You provide concise, actionable, and spoiler-free hints to players who \
    are stuck on a puzzle. Do not reveal the exact solution, but guide them towards the next step.";

/// Shown whenever no hint could be generated
pub const FALLBACK_HINT: &str = "Could not generate a hint at this time.";

/// Live state handed to the generator
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest<'a> {
    pub level_id: &'a str,
    pub level_name: &'a str,
    pub goal: &'a str,
    pub objects: &'a [GameObject],
    pub policy: &'a TimeControl,
    pub simulated_time: f32,
}

impl<'a> HintRequest<'a> {
    pub fn from_session(session: &'a Session) -> Self {
        let level = session.level();
        Self {
            level_id: &level.id,
            level_name: &level.name,
            goal: &level.goal,
            objects: session.objects(),
            policy: session.policy(),
            simulated_time: session.sim_time(),
        }
    }
}

/// Full prompt text for the session's current state
pub fn build_prompt(session: &Session) -> Result<String, HintError> {
    let level_prompt = session
        .level()
        .hint_prompt
        .as_deref()
        .ok_or(HintError::MissingPrompt)?;
    let state = serde_json::to_string_pretty(&HintRequest::from_session(session))
        .map_err(|e| HintError::Service(e.to_string()))?;

    Ok(format!(
        "{SYSTEM_INSTRUCTION}\n\n\
         Here's the current game state:\n```json\n{state}\n```\n\n\
         Level-specific hint request: \"{level_prompt}\"\n\n\
         Please provide a concise and helpful hint, without directly solving the puzzle."
    ))
}

/// External text generator
#[allow(async_fn_in_trait)]
pub trait HintGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, HintError>;
}

/// Generator for builds without a text service
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl HintGenerator for Offline {
    async fn generate(&self, _prompt: &str) -> Result<String, HintError> {
        Err(HintError::Service("no hint service configured".to_string()))
    }
}

/// Run the rewarded gate, then ask the generator
///
/// `prompt` is called after the gate resolves so the hint reflects the state
/// the player sees once the ad is over.
pub async fn request_hint(
    ads: &impl AdGate,
    generator: &impl HintGenerator,
    prompt: impl FnOnce() -> Result<String, HintError>,
) -> String {
    ads.rewarded().await;

    let result = match prompt() {
        Ok(prompt) => generator.generate(&prompt).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            log::warn!("Hint unavailable: {}", HintError::Empty);
            FALLBACK_HINT.to_string()
        }
        Err(e) => {
            log::warn!("Hint unavailable: {e}");
            FALLBACK_HINT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::PassThroughGate;
    use crate::levels::LevelCatalog;
    use crate::settings::Settings;
    use crate::sim::Level;
    use std::cell::Cell;
    use std::sync::Arc;

    struct Canned(&'static str);

    impl HintGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, HintError> {
            Ok(self.0.to_string())
        }
    }

    struct CountingGate {
        rewarded: Cell<u32>,
    }

    impl AdGate for CountingGate {
        async fn rewarded(&self) {
            self.rewarded.set(self.rewarded.get() + 1);
        }

        async fn interstitial(&self) {}
    }

    fn orchard() -> Session {
        let level = LevelCatalog::builtin().find_by_id("level-1").unwrap().clone();
        Session::new(level, &Settings::default())
    }

    #[test]
    fn test_prompt_includes_state() {
        let mut session = orchard();
        session.start();
        session.tick(1.0);
        let prompt = build_prompt(&session).unwrap();

        assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.contains("\"levelId\": \"level-1\""));
        assert!(prompt.contains("\"simulatedTime\": 1.0"));
        assert!(prompt.contains("apple-3"));
        assert!(prompt.contains("Level-specific hint request"));
    }

    #[test]
    fn test_prompt_requires_level_prompt() {
        let mut level: Level = (**LevelCatalog::builtin().first().unwrap()).clone();
        level.hint_prompt = None;
        let session = Session::new(Arc::new(level), &Settings::default());
        assert_eq!(build_prompt(&session), Err(HintError::MissingPrompt));
    }

    #[tokio::test]
    async fn test_hint_after_rewarded_gate() {
        let gate = CountingGate {
            rewarded: Cell::new(0),
        };
        let session = orchard();
        let hint = request_hint(&gate, &Canned("  Try speeding up.  "), || {
            build_prompt(&session)
        })
        .await;
        assert_eq!(hint, "Try speeding up.");
        assert_eq!(gate.rewarded.get(), 1);
    }

    #[tokio::test]
    async fn test_failures_fall_back() {
        let session = orchard();
        let offline = request_hint(&PassThroughGate, &Offline, || build_prompt(&session)).await;
        assert_eq!(offline, FALLBACK_HINT);

        let empty = request_hint(&PassThroughGate, &Canned("   "), || build_prompt(&session)).await;
        assert_eq!(empty, FALLBACK_HINT);

        let missing = request_hint(&PassThroughGate, &Canned("unused"), || {
            Err(HintError::MissingPrompt)
        })
        .await;
        assert_eq!(missing, FALLBACK_HINT);
    }
}
