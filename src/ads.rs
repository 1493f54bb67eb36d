//! Ad gates
//!
//! The game never talks to an ad network. It only awaits two barriers: a
//! rewarded gate before a hint and a frequency-capped interstitial before a
//! level starts. Neither affects the simulation.

/// Async barriers the frontend resolves once an ad has run
#[allow(async_fn_in_trait)]
pub trait AdGate {
    /// Resolves when the player has earned the reward
    async fn rewarded(&self);
    /// Resolves when the interstitial has been dismissed
    async fn interstitial(&self);
}

/// Gate that opens immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughGate;

impl AdGate for PassThroughGate {
    async fn rewarded(&self) {}

    async fn interstitial(&self) {}
}

/// Show an interstitial every `frequency_cap` levels (0 disables it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterstitialPolicy {
    pub frequency_cap: u32,
}

impl Default for InterstitialPolicy {
    fn default() -> Self {
        Self { frequency_cap: 3 }
    }
}

impl InterstitialPolicy {
    /// Whether an interstitial is due before the level at `current`
    pub fn is_due(&self, current: usize, last_shown: usize) -> bool {
        if self.frequency_cap == 0 {
            return false;
        }
        let since = current as i64 - last_shown as i64;
        since >= self.frequency_cap as i64
    }
}
