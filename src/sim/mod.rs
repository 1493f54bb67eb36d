//! Deterministic simulation module
//!
//! All puzzle logic lives here. This module must stay pure:
//! - The stepper never mutates its input
//! - Stable iteration order (object list order)
//! - No rendering, storage or platform dependencies

pub mod history;
pub mod level;
pub mod state;
pub mod tick;

pub use history::{HistoryBuffer, Snapshot};
pub use level::{Level, WinCondition};
pub use state::{Control, Direction, GameObject, ObjectKind, TimeAffinity, TimeControl, find};
pub use tick::{StepEvent, StepResult, step};
