// THEORY:
// The rotation is a tiny state machine with two shapes: `Idle` before any
// approach has been chosen, and `Active(i)` once approach `i` holds green.
// The transition rules live here as pure functions over `SignalState` so they
// can be reasoned about and tested without any approaches, timers or events.
//
// 1.  **Activation**: the first approach with traffic becomes green. Without
//     traffic the machine keeps whatever state it had; there is no path from
//     `Active` back to `Idle`.
// 2.  **Tick**: `Active(i)` always moves to `Active((i + 1) mod N)`. `Idle`
//     ignores ticks.
//
// `RotationState` pairs the machine state with the instant the current dwell
// began, which is all the timing the scheduler needs to own.

use tokio::time::{Duration, Instant};

/// Which approach, if any, currently holds green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalState {
    Idle,
    Active(usize),
}

impl SignalState {
    pub fn active_index(&self) -> Option<usize> {
        match self {
            SignalState::Idle => None,
            SignalState::Active(i) => Some(*i),
        }
    }
}

/// The scheduler's private rotation bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    pub state: SignalState,
    /// When the current approach went green. `None` while idle.
    pub dwell_started: Option<Instant>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            state: SignalState::Idle,
            dwell_started: None,
        }
    }
}

impl RotationState {
    /// Moves to `state` and restarts the dwell clock.
    pub fn enter(&mut self, state: SignalState) {
        self.state = state;
        self.dwell_started = match state {
            SignalState::Idle => None,
            SignalState::Active(_) => Some(Instant::now()),
        };
    }

    pub fn dwell_elapsed(&self) -> Option<Duration> {
        self.dwell_started.map(|started| started.elapsed())
    }
}

/// State after seeding the rotation with the index of the first occupied approach.
pub fn on_activate(state: SignalState, first_occupied: Option<usize>) -> SignalState {
    match first_occupied {
        Some(i) => SignalState::Active(i),
        None => state,
    }
}

/// State after one dwell period elapses on a rotation of `approach_count` approaches.
pub fn on_tick(state: SignalState, approach_count: usize) -> SignalState {
    match state {
        SignalState::Idle => SignalState::Idle,
        SignalState::Active(_) if approach_count == 0 => state,
        SignalState::Active(i) => SignalState::Active((i + 1) % approach_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_picks_occupied_index() {
        assert_eq!(on_activate(SignalState::Idle, Some(2)), SignalState::Active(2));
    }

    #[test]
    fn activate_without_traffic_keeps_state() {
        assert_eq!(on_activate(SignalState::Idle, None), SignalState::Idle);
        assert_eq!(on_activate(SignalState::Active(3), None), SignalState::Active(3));
    }

    #[test]
    fn tick_wraps_around() {
        assert_eq!(on_tick(SignalState::Active(3), 4), SignalState::Active(0));
        assert_eq!(on_tick(SignalState::Active(0), 1), SignalState::Active(0));
    }

    #[test]
    fn tick_while_idle_is_noop() {
        assert_eq!(on_tick(SignalState::Idle, 4), SignalState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dwell_clock_restarts_on_enter() {
        let mut rotation = RotationState::default();
        assert_eq!(rotation.dwell_elapsed(), None);

        rotation.enter(SignalState::Active(0));
        tokio::time::advance(Duration::from_millis(700)).await;
        assert_eq!(rotation.dwell_elapsed(), Some(Duration::from_millis(700)));

        rotation.enter(SignalState::Active(1));
        assert_eq!(rotation.dwell_elapsed(), Some(Duration::ZERO));
    }
}
