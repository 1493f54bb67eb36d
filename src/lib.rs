//! ChronoCrafters - A time-manipulation puzzle game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (objects, stepper, rewind history, levels)
//! - `session`: Level session state machine driven by the frame loop
//! - `levels`: Built-in and JSON level catalogs
//! - `platform`: Browser/native key-value storage
//! - `persistence`: Completed levels and interstitial bookkeeping
//! - `hint` / `ads`: External collaborator boundaries
//! - `app`: Navigation shell tying the above together

pub mod ads;
pub mod app;
pub mod error;
pub mod hint;
pub mod levels;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use app::App;
pub use error::{Error, HintError, Result, RewindError};
pub use levels::LevelCatalog;
pub use session::{LevelResult, Outcome, Phase, Session, SessionEvent};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Plant growth per simulated second
    pub const GROWTH_RATE: f32 = 0.1;
    /// Growth stage at which a plant counts as ripe
    pub const RIPE_THRESHOLD: f32 = 0.99;

    /// Falling speed of movables (pixels per simulated second)
    pub const FALL_SPEED: f32 = 50.0;
    /// Platform travel speed toward its target (pixels per second)
    pub const PLATFORM_SPEED: f32 = 30.0;

    /// Clock multiplier for objects running on their own time
    pub const SELF_TIME_RATE: f32 = 2.0;

    /// Upper bound on snapshots a history buffer may keep
    pub const MAX_HISTORY_SNAPSHOTS: usize = 10_000;

    /// Rewind charges for levels that don't specify any
    pub const DEFAULT_REWIND_CHARGES: u32 = 3;

    /// Star tiers (simulated seconds, exclusive)
    pub const THREE_STAR_TIME: f32 = 20.0;
    pub const TWO_STAR_TIME: f32 = 40.0;
}
