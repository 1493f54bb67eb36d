//! Simulation stepper
//!
//! `step` is a pure function: it reads the current objects and policy and
//! returns a fresh object list plus anything noteworthy that happened.

use super::state::{GameObject, ObjectKind, TimeAffinity, TimeControl};
use crate::consts::*;

/// Something a step wants the caller to know about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// A fragile object hit the ground
    Shattered { id: String },
}

/// Output of a single step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub objects: Vec<GameObject>,
    pub events: Vec<StepEvent>,
    /// False when the policy froze time and nothing was applied
    pub advanced: bool,
}

/// Advance every object by `wall_dt` wall-clock seconds under `policy`
///
/// Never panics and never mutates `objects`. A zero global speed (or a
/// non-finite delta) returns the objects unchanged.
pub fn step(objects: &[GameObject], policy: &TimeControl, wall_dt: f32) -> StepResult {
    let wall_dt = if wall_dt.is_finite() { wall_dt.max(0.0) } else { 0.0 };
    let effective = policy.effective_delta(wall_dt);

    if policy.is_frozen() || !effective.is_finite() {
        return StepResult {
            objects: objects.to_vec(),
            events: Vec::new(),
            advanced: false,
        };
    }

    // Ground is static, so reading it from the input is enough
    let ground_y = objects.iter().find(|o| o.is_ground()).map(|g| g.pos.y);

    let mut events = Vec::new();
    let objects = objects
        .iter()
        .map(|obj| {
            let mut next = obj.clone();
            if policy.is_paused(&obj.id) {
                return next;
            }
            let delta = match obj.time_affinity {
                TimeAffinity::Dimension => effective,
                TimeAffinity::Own => wall_dt * SELF_TIME_RATE,
            };
            advance_object(&mut next, delta, ground_y, &mut events);
            next
        })
        .collect();

    StepResult {
        objects,
        events,
        advanced: true,
    }
}

/// Apply the kind-specific rule to one object
fn advance_object(
    obj: &mut GameObject,
    delta: f32,
    ground_y: Option<f32>,
    events: &mut Vec<StepEvent>,
) {
    match &mut obj.kind {
        ObjectKind::Plant { growth_stage, ripe } => {
            *growth_stage = (*growth_stage + delta * GROWTH_RATE).clamp(0.0, 1.0);
            *ripe = *growth_stage >= RIPE_THRESHOLD;
        }
        ObjectKind::Movable {
            falling,
            fragile,
            shattered,
            target_y,
        } => {
            // Positive delta moves down; reverse lifts, landing is never undone
            if let (true, Some(ground_y)) = (*falling, ground_y) {
                obj.pos.y += delta * FALL_SPEED;
                if obj.pos.y + obj.size.y >= ground_y {
                    obj.pos.y = ground_y - obj.size.y;
                    *falling = false;
                    if *fragile && !*shattered {
                        *shattered = true;
                        events.push(StepEvent::Shattered { id: obj.id.clone() });
                    }
                }
            }

            // Platforms only ever close in on their target
            if let Some(target) = *target_y {
                obj.pos.y = approach(obj.pos.y, target, delta.abs() * PLATFORM_SPEED);
            }
        }
        // Buttons change only through player interaction
        ObjectKind::Button { .. } | ObjectKind::Static { .. } => {}
    }
}

/// Move `current` toward `target` by at most `amount`
fn approach(current: f32, target: f32, amount: f32) -> f32 {
    if current < target {
        (current + amount).min(target)
    } else {
        (current - amount).max(target)
    }
}
