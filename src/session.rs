//! Level session controller
//!
//! One authoritative `Session` per played level. The frontend's frame loop
//! drives it through `frame`/`tick`; everything observable leaves through
//! drained `SessionEvent`s. The session itself performs no I/O.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::RewindError;
use crate::settings::Settings;
use crate::sim::{
    Control, Direction, GameObject, HistoryBuffer, Level, ObjectKind, Snapshot, StepEvent,
    TimeControl, step,
};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    /// Seeded, waiting for start
    Idle,
    /// Ticking
    Running,
    /// Loop suspended by the player
    Paused,
    /// Showing a just-restored snapshot; ticking resumes after `remaining` seconds
    Rewinding { remaining: f32 },
    /// Win condition met
    Won,
    /// Fragile object shattered
    Lost,
}

/// Final result of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[default]
    Pending,
    Won,
    Lost,
}

/// Summary handed out when a level is won
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub level_id: String,
    /// Simulated seconds at the winning tick
    pub time_taken: f32,
    pub rewinds_used: u32,
    pub stars: u8,
}

/// Observable side effects of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started,
    Reset,
    Pressed { id: String },
    RewindSucceeded { restored_time: f32, charges_left: u32 },
    RewindFailed(RewindError),
    Won(LevelResult),
    Lost { object: String },
}

/// Permission for one scheduled frame; stale once the loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    epoch: u64,
}

/// What the frame scheduler should do with its pending callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// The pending callback already matches the session
    Keep,
    /// Drop any pending callback and schedule one with this ticket
    Schedule(FrameTicket),
    /// Drop the pending callback
    Cancel,
}

/// Star rating for a win after `time` simulated seconds
pub fn stars(time: f32, rewinds_used: u32) -> u8 {
    if time < THREE_STAR_TIME && rewinds_used == 0 {
        3
    } else if time < TWO_STAR_TIME && rewinds_used <= 1 {
        2
    } else {
        1
    }
}

/// State of one level being played
#[derive(Debug, Clone)]
pub struct Session {
    level: Arc<Level>,
    settings: Settings,
    objects: Vec<GameObject>,
    policy: TimeControl,
    sim_time: f32,
    phase: Phase,
    outcome: Outcome,
    charges: u32,
    history: HistoryBuffer,
    result: Option<LevelResult>,
    events: Vec<SessionEvent>,
    /// Bumped every time the loop stops
    epoch: u64,
    /// Wall-clock seconds of the previous frame
    last_frame: Option<f64>,
}

impl Session {
    /// Create an idle session seeded from `level`
    ///
    /// Invalid settings are replaced by the defaults.
    pub fn new(level: Arc<Level>, settings: &Settings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings.clone(),
            Err(e) => {
                log::warn!("Using default settings for level {}: {e}", level.id);
                Settings::default()
            }
        };
        let history = HistoryBuffer::new(settings.snapshot_interval, settings.max_history_seconds);
        let mut session = Self {
            objects: Vec::new(),
            policy: TimeControl::default(),
            sim_time: 0.0,
            phase: Phase::Idle,
            outcome: Outcome::Pending,
            charges: level.rewind_charges,
            history,
            result: None,
            events: Vec::new(),
            epoch: 0,
            last_frame: None,
            level,
            settings,
        };
        session.reseed();
        session
    }

    // === Accessors ===

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn policy(&self) -> &TimeControl {
        &self.policy
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn rewind_charges(&self) -> u32 {
        self.charges
    }

    pub fn rewinds_used(&self) -> u32 {
        self.level.rewind_charges.saturating_sub(self.charges)
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn result(&self) -> Option<&LevelResult> {
        self.result.as_ref()
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether the frame loop should keep scheduling callbacks
    pub fn is_looping(&self) -> bool {
        matches!(self.phase, Phase::Running | Phase::Rewinding { .. })
    }

    // === Lifecycle ===

    /// (Re)start the level from its initial state
    pub fn start(&mut self) {
        self.stop_loop();
        self.reseed();
        self.history
            .record(Snapshot::new(self.objects.clone(), self.policy.clone(), 0.0));
        self.phase = Phase::Running;
        self.events.push(SessionEvent::Started);
        log::info!("Level {} started", self.level.id);
    }

    /// Back to idle with a fresh seed
    pub fn reset(&mut self) {
        self.stop_loop();
        self.reseed();
        self.phase = Phase::Idle;
        self.events.push(SessionEvent::Reset);
        log::info!("Level {} reset", self.level.id);
    }

    /// Suspend the loop; returns false unless the level was running
    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.stop_loop();
        self.phase = Phase::Paused;
        log::debug!("Level {} paused at t={:.2}", self.level.id, self.sim_time);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = Phase::Running;
        log::debug!("Level {} resumed", self.level.id);
        true
    }

    fn reseed(&mut self) {
        self.objects = self.level.initial_state.clone();
        self.policy = TimeControl::default();
        self.sim_time = 0.0;
        self.charges = self.level.rewind_charges;
        self.outcome = Outcome::Pending;
        self.result = None;
        self.history.clear();
    }

    /// Invalidate outstanding frame tickets
    fn stop_loop(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.last_frame = None;
    }

    // === Frame loop ===

    /// Ticket for the next scheduled frame, if the loop is active
    pub fn frame_ticket(&self) -> Option<FrameTicket> {
        self.is_looping().then_some(FrameTicket { epoch: self.epoch })
    }

    /// Reconcile the scheduler's pending ticket with the loop state
    ///
    /// A pending ticket from an older epoch (restart while running) is
    /// replaced rather than kept.
    pub fn loop_action(&self, pending: Option<FrameTicket>) -> LoopAction {
        match (self.frame_ticket(), pending) {
            (Some(current), Some(pending)) if current == pending => LoopAction::Keep,
            (Some(current), _) => LoopAction::Schedule(current),
            (None, Some(_)) => LoopAction::Cancel,
            (None, None) => LoopAction::Keep,
        }
    }

    /// Run one scheduled frame at wall-clock `now` (seconds)
    ///
    /// Returns false for stale tickets, which never touch the session.
    pub fn frame(&mut self, ticket: FrameTicket, now: f64) -> bool {
        if ticket.epoch != self.epoch || !self.is_looping() {
            return false;
        }
        let dt = match self.last_frame {
            Some(last) => ((now - last) as f32).clamp(0.0, self.settings.max_frame_delta),
            None => 0.0,
        };
        self.last_frame = Some(now);
        self.tick(dt);
        true
    }

    /// Advance by `wall_dt` wall-clock seconds
    pub fn tick(&mut self, wall_dt: f32) {
        let wall_dt = if wall_dt.is_finite() { wall_dt.max(0.0) } else { 0.0 };
        match self.phase {
            Phase::Running => self.advance(wall_dt),
            Phase::Rewinding { remaining } => {
                let remaining = remaining - wall_dt;
                self.phase = if remaining > 0.0 {
                    Phase::Rewinding { remaining }
                } else {
                    Phase::Running
                };
            }
            Phase::Idle | Phase::Paused | Phase::Won | Phase::Lost => {}
        }
    }

    /// Objects, then time, then history, then win/fail
    fn advance(&mut self, wall_dt: f32) {
        let result = step(&self.objects, &self.policy, wall_dt);
        if !result.advanced {
            return;
        }
        self.objects = result.objects;

        let previous = self.sim_time;
        self.sim_time += self.policy.effective_delta(wall_dt);
        if self.sim_time < previous {
            self.history.truncate_after(self.sim_time);
        }
        if self.history.should_record(self.sim_time) {
            self.history.record(Snapshot::new(
                self.objects.clone(),
                self.policy.clone(),
                self.sim_time,
            ));
        }

        if let Some(StepEvent::Shattered { id }) = result.events.into_iter().next() {
            self.finish_lost(id);
        } else if self.level.win.is_met(&self.objects) {
            self.finish_won();
        }
    }

    fn finish_won(&mut self) {
        if self.outcome != Outcome::Pending {
            return;
        }
        self.stop_loop();
        self.phase = Phase::Won;
        self.outcome = Outcome::Won;

        let rewinds_used = self.rewinds_used();
        let result = LevelResult {
            level_id: self.level.id.clone(),
            time_taken: self.sim_time,
            rewinds_used,
            stars: stars(self.sim_time, rewinds_used),
        };
        log::info!(
            "Level {} complete in {:.1}s with {} rewinds ({} stars)",
            result.level_id,
            result.time_taken,
            result.rewinds_used,
            result.stars
        );
        self.result = Some(result.clone());
        self.events.push(SessionEvent::Won(result));
    }

    fn finish_lost(&mut self, object: String) {
        if self.outcome != Outcome::Pending {
            return;
        }
        self.stop_loop();
        self.phase = Phase::Lost;
        self.outcome = Outcome::Lost;
        log::info!("Level {} failed: {} shattered", self.level.id, object);
        self.events.push(SessionEvent::Lost { object });
    }

    // === Time controls ===

    fn control_allowed(&self, control: Control) -> bool {
        if self.phase != Phase::Running {
            log::warn!("Ignoring {control:?} change outside a running level");
            return false;
        }
        if !self.level.allows(control) {
            log::warn!("Level {} does not allow {control:?}", self.level.id);
            return false;
        }
        true
    }

    /// Set the global speed; ignored if not allowed or not a valid speed
    pub fn set_global_speed(&mut self, speed: f32) -> bool {
        if !self.control_allowed(Control::GlobalSpeed) {
            return false;
        }
        if !speed.is_finite() || speed < 0.0 {
            log::warn!("Ignoring invalid global speed {speed}");
            return false;
        }
        self.policy.global_speed = speed;
        log::debug!("Global speed set to {speed}");
        true
    }

    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if !self.control_allowed(Control::Direction) {
            return false;
        }
        self.policy.direction = direction;
        log::debug!("Direction set to {direction:?}");
        true
    }

    /// Freeze or unfreeze one plant or movable
    pub fn toggle_paused(&mut self, id: &str) -> bool {
        if !self.control_allowed(Control::PauseObject) {
            return false;
        }
        let pausable = self
            .objects
            .iter()
            .any(|o| o.id == id && o.is_pausable());
        if !pausable {
            log::warn!("Ignoring pause toggle for `{id}`");
            return false;
        }
        let paused = self.policy.toggle_paused(id);
        log::debug!("{id} {}", if paused { "paused" } else { "unpaused" });
        true
    }

    // === Interaction ===

    /// Press a button at the current simulated time
    pub fn press(&mut self, id: &str) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        let sim_time = self.sim_time;
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        let ObjectKind::Button {
            pressed,
            press_time,
        } = &mut obj.kind
        else {
            return false;
        };
        *pressed = true;
        *press_time = sim_time;
        log::debug!("Button {id} pressed at t={sim_time:.2}");
        self.events.push(SessionEvent::Pressed { id: id.to_string() });
        true
    }

    // === Rewind ===

    /// Roll back `duration` simulated seconds
    pub fn rewind(&mut self, duration: f32) -> Result<f32, RewindError> {
        self.rewind_to(self.sim_time - duration)
    }

    /// Restore the snapshot closest to `target`; returns its simulated time
    pub fn rewind_to(&mut self, target: f32) -> Result<f32, RewindError> {
        if self.phase != Phase::Running {
            return self.rewind_failed(RewindError::NotRunning);
        }
        if self.charges == 0 {
            return self.rewind_failed(RewindError::NoCharges);
        }

        self.charges -= 1;
        let Some(snapshot) = self.history.nearest(target).cloned() else {
            self.charges = (self.charges + 1).min(self.level.rewind_charges);
            return self.rewind_failed(RewindError::NoSnapshot);
        };

        self.objects = snapshot.objects().to_vec();
        self.policy = snapshot.policy().clone();
        self.sim_time = snapshot.sim_time();
        self.history.truncate_after(self.sim_time);

        let pause = self.settings.rewind_pause_seconds;
        self.phase = if pause > 0.0 {
            Phase::Rewinding { remaining: pause }
        } else {
            Phase::Running
        };

        log::debug!(
            "Rewound to t={:.2} ({} charges left)",
            self.sim_time,
            self.charges
        );
        self.events.push(SessionEvent::RewindSucceeded {
            restored_time: self.sim_time,
            charges_left: self.charges,
        });
        Ok(self.sim_time)
    }

    fn rewind_failed(&mut self, error: RewindError) -> Result<f32, RewindError> {
        log::debug!("Rewind failed: {error}");
        self.events.push(SessionEvent::RewindFailed(error));
        Err(error)
    }
}
