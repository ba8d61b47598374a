// THEORY:
// The `SignalScheduler` is the only owner of rotation state. It holds the
// configured approaches, the `RotationState`, and the sending half of the
// event bus. Every change to which approach is green goes through exactly two
// methods, `activate` and `tick`, and both keep the green flags in lockstep
// with the state machine: approach `i` is green if and only if the state is
// `Active(i)`.
//
// The scheduler itself is synchronous and has no notion of wall-clock timers.
// Serialising calls and firing `tick` on time is the controller's job.

use crate::core_modules::approach::Approach;
use crate::core_modules::rotation::{self, RotationState, SignalState};
use crate::core_modules::snapshot::OccupancySnapshot;
use crate::error::{ConfigError, ScheduleError};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{debug, info};

/// A state change published by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    /// `activate` chose an approach to hold green. `from` is the approach that
    /// lost green when the rotation was reseeded while already running.
    Activated {
        from: Option<usize>,
        to: usize,
        name: String,
    },
    /// A dwell period ended and green moved on to the next approach.
    Rotated { from: usize, to: usize, name: String },
    /// `activate` found no traffic anywhere and the scheduler stayed idle.
    StayedIdle,
}

pub struct SignalScheduler {
    approaches: Vec<Approach>,
    rotation: RotationState,
    events: broadcast::Sender<SignalEvent>,
}

impl SignalScheduler {
    /// Builds an idle scheduler over the configured approach names.
    pub fn new<I, S>(names: I, event_capacity: usize) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let approaches: Vec<Approach> = names.into_iter().map(Approach::new).collect();
        if approaches.is_empty() {
            return Err(ConfigError::Empty);
        }
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Ok(Self {
            approaches,
            rotation: RotationState::default(),
            events,
        })
    }

    /// Seeds the rotation from a fresh snapshot.
    ///
    /// The first approach with a positive count becomes green. With no traffic
    /// anywhere the current state is kept. Counts are always refreshed.
    pub fn activate(&mut self, snapshot: OccupancySnapshot) -> Result<SignalState, ScheduleError> {
        self.check_snapshot(&snapshot)?;

        for (approach, reading) in self.approaches.iter_mut().zip(snapshot.readings()) {
            approach.count = reading.count;
        }

        let seed = self.approaches.iter().position(Approach::is_eligible);
        let previous = self.rotation.state;
        let next = rotation::on_activate(previous, seed);

        match next {
            SignalState::Active(to) if seed.is_some() => {
                self.set_green(next);
                self.rotation.enter(next);
                info!(approach = %self.approaches[to].name, index = to, "activated");
                self.publish(SignalEvent::Activated {
                    from: previous.active_index(),
                    to,
                    name: self.approaches[to].name.clone(),
                });
            }
            SignalState::Active(current) => {
                debug!(index = current, "no occupied approach, rotation continues");
            }
            SignalState::Idle => {
                info!("no occupied approach, staying idle");
                self.publish(SignalEvent::StayedIdle);
            }
        }

        Ok(self.rotation.state)
    }

    /// Ends the current dwell and hands green to the next approach in order.
    /// Does nothing while idle.
    pub fn tick(&mut self) -> SignalState {
        let previous = self.rotation.state;
        let next = rotation::on_tick(previous, self.approaches.len());

        if let (SignalState::Active(from), SignalState::Active(to)) = (previous, next) {
            self.set_green(next);
            self.rotation.enter(next);
            debug!(from, to, approach = %self.approaches[to].name, "rotated");
            self.publish(SignalEvent::Rotated {
                from,
                to,
                name: self.approaches[to].name.clone(),
            });
        }

        self.rotation.state
    }

    pub fn state(&self) -> SignalState {
        self.rotation.state
    }

    pub fn approaches(&self) -> &[Approach] {
        &self.approaches
    }

    /// Time since the current approach went green.
    pub fn dwell_elapsed(&self) -> Option<Duration> {
        self.rotation.dwell_elapsed()
    }

    pub fn green_map(&self) -> Vec<(String, bool)> {
        self.approaches
            .iter()
            .map(|a| (a.name.clone(), a.has_green))
            .collect()
    }

    pub fn occupancy_map(&self) -> Vec<(String, u32)> {
        self.approaches
            .iter()
            .map(|a| (a.name.clone(), a.count))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }

    fn set_green(&mut self, state: SignalState) {
        let green = state.active_index();
        for (i, approach) in self.approaches.iter_mut().enumerate() {
            approach.has_green = Some(i) == green;
        }
    }

    fn check_snapshot(&self, snapshot: &OccupancySnapshot) -> Result<(), ScheduleError> {
        if snapshot.len() != self.approaches.len() {
            return Err(ScheduleError::SnapshotMismatch(format!(
                "expected {} readings, got {}",
                self.approaches.len(),
                snapshot.len()
            )));
        }
        for (approach, reading) in self.approaches.iter().zip(snapshot.readings()) {
            if approach.name != reading.name {
                return Err(ScheduleError::SnapshotMismatch(format!(
                    "expected {:?}, got {:?}",
                    approach.name, reading.name
                )));
            }
        }
        Ok(())
    }

    fn publish(&self, event: SignalEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
