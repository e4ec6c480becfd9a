//! The two per-tick checkpoints at which the host hears about the simulation.
//!
//! Observers subscribe to a [`Checkpoint`] and are called synchronously, in subscription order,
//! every time the simulation reaches it. Each observer sees the simulation read-only and a
//! shared [`WeeklyUpdateEvent`]; any of them may ask for the run to stop.

use std::fmt;

use serde::Serialize;

use crate::simulation::Simulation;
use crate::time::Tick;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    /// After interventions, before animals flagged for death are removed.
    BeforeRemovingDead,
    /// After the dead have been removed.
    AfterRemovingDead,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::BeforeRemovingDead => write!(f, "before removing dead"),
            Checkpoint::AfterRemovingDead => write!(f, "after removing dead"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeeklyUpdateEvent {
    pub year: u32,
    pub week: u32,
    pub checkpoint: Checkpoint,
    abort: bool,
}

impl WeeklyUpdateEvent {
    pub fn new(tick: Tick, checkpoint: Checkpoint) -> WeeklyUpdateEvent {
        WeeklyUpdateEvent {
            year: tick.year,
            week: tick.week,
            checkpoint,
            abort: false,
        }
    }

    pub fn tick(&self) -> Tick {
        Tick {
            year: self.year,
            week: self.week,
        }
    }

    pub fn request_abort(&mut self) {
        self.abort = true;
    }

    pub fn abort_requested(&self) -> bool {
        self.abort
    }
}

pub type WeeklyObserver = Box<dyn FnMut(&Simulation, &mut WeeklyUpdateEvent)>;

#[derive(Default)]
pub struct NotificationChannel {
    before_removing_dead: Vec<WeeklyObserver>,
    after_removing_dead: Vec<WeeklyObserver>,
}

impl NotificationChannel {
    pub fn new() -> NotificationChannel {
        NotificationChannel::default()
    }

    pub fn subscribe(
        &mut self,
        checkpoint: Checkpoint,
        observer: impl FnMut(&Simulation, &mut WeeklyUpdateEvent) + 'static,
    ) {
        self.observers_mut(checkpoint).push(Box::new(observer));
    }

    pub fn observer_count(&self, checkpoint: Checkpoint) -> usize {
        match checkpoint {
            Checkpoint::BeforeRemovingDead => self.before_removing_dead.len(),
            Checkpoint::AfterRemovingDead => self.after_removing_dead.len(),
        }
    }

    /// Removes the observers of `checkpoint` so they can be called with the simulation borrowed.
    /// They must be handed back with [`NotificationChannel::restore`].
    pub(crate) fn take(&mut self, checkpoint: Checkpoint) -> Vec<WeeklyObserver> {
        std::mem::take(self.observers_mut(checkpoint))
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint, mut observers: Vec<WeeklyObserver>) {
        let slot = self.observers_mut(checkpoint);
        observers.append(slot);
        *slot = observers;
    }

    fn observers_mut(&mut self, checkpoint: Checkpoint) -> &mut Vec<WeeklyObserver> {
        match checkpoint {
            Checkpoint::BeforeRemovingDead => &mut self.before_removing_dead,
            Checkpoint::AfterRemovingDead => &mut self.after_removing_dead,
        }
    }
}
