//! Rewind history
//!
//! A bounded FIFO of snapshots taken at fixed intervals of simulated time.
//! Snapshot times are non-decreasing from front to back.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::state::{GameObject, TimeControl};
use crate::consts::MAX_HISTORY_SNAPSHOTS;

/// Full session state at one point in simulated time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    objects: Vec<GameObject>,
    policy: TimeControl,
    sim_time: f32,
}

impl Snapshot {
    pub fn new(objects: Vec<GameObject>, policy: TimeControl, sim_time: f32) -> Self {
        Self {
            objects,
            policy,
            sim_time,
        }
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
}

/// Ring of snapshots used by rewind
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    snapshots: VecDeque<Snapshot>,
    /// Simulated seconds between recordings
    interval: f32,
    /// Maximum retained snapshots
    capacity: usize,
}

impl HistoryBuffer {
    /// Buffer covering `max_seconds` of simulated time at one snapshot per `interval`
    ///
    /// Capacity is at least 1 and at most `MAX_HISTORY_SNAPSHOTS`.
    pub fn new(interval: f32, max_seconds: f32) -> Self {
        let slots = (max_seconds / interval).ceil();
        let capacity = if slots.is_nan() {
            1
        } else {
            slots.clamp(1.0, MAX_HISTORY_SNAPSHOTS as f32) as usize
        };
        Self {
            snapshots: VecDeque::new(),
            interval,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Whether enough simulated time has passed since the last recording
    pub fn should_record(&self, sim_time: f32) -> bool {
        match self.latest() {
            Some(last) => sim_time - last.sim_time >= self.interval,
            None => true,
        }
    }

    /// Append a snapshot, evicting the oldest past capacity
    pub fn record(&mut self, snapshot: Snapshot) {
        self.snapshots.push_back(snapshot);
        self.capacity_trim();
    }

    /// Drop oldest entries until the buffer fits its capacity
    pub fn capacity_trim(&mut self) {
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }

    /// Index of the snapshot closest to `target`; ties go to the oldest
    pub fn nearest_index(&self, target: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, snap) in self.snapshots.iter().enumerate() {
            let distance = (snap.sim_time - target).abs();
            let closer = match best {
                Some((_, best_distance)) => distance < best_distance,
                None => true,
            };
            if closer {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Snapshot closest to `target` in simulated time
    pub fn nearest(&self, target: f32) -> Option<&Snapshot> {
        self.nearest_index(target).and_then(|i| self.snapshots.get(i))
    }

    /// Discard every snapshot newer than `sim_time`
    pub fn truncate_after(&mut self, sim_time: f32) {
        while self
            .snapshots
            .back()
            .is_some_and(|s| s.sim_time > sim_time)
        {
            self.snapshots.pop_back();
        }
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
