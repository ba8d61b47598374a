// THEORY:
// The `SignalController` is the top-level API of the crate. It puts the whole
// feedback loop behind one interface: the sampler that looks at the cameras,
// the scheduler that owns the rotation, and the single dwell timer that keeps
// the rotation moving.
//
// Key architectural principles:
// 1.  **One Serialisation Point**: the scheduler sits behind one async mutex.
//     The dwell timer and `run_cycle` both go through it, so `activate` and
//     `tick` never overlap.
// 2.  **One Timer**: there is at most one dwell timer task. Starting a dwell
//     aborts the previous task, so timer state can never drift away from
//     which approach is green.
// 3.  **One Cycle Operation**: `run_cycle` is "sample, then activate". Every
//     trigger (an operator command, a periodic job, a test) calls the same
//     method.
// 4.  **Read-Only Reporting**: displays get copies of the green and occupancy
//     maps or subscribe to `SignalEvent`s; they never touch the rotation.

use crate::config::ControllerConfig;
use crate::core_modules::capture_store::CaptureStore;
use crate::core_modules::frame_source::ImageSequenceSource;
use crate::core_modules::rotation::SignalState;
use crate::core_modules::sampler::{ApproachFeed, CapturedFrame, OccupancySampler};
use crate::core_modules::scheduler::{SignalEvent, SignalScheduler};
use crate::core_modules::vehicle_counter::{BlobCounter, VehicleCounter};
use crate::display::SignalBoard;
use crate::error::{ScheduleError, StartupError};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct SignalController {
    scheduler: Arc<Mutex<SignalScheduler>>,
    sampler: Mutex<OccupancySampler>,
    dwell_timer: StdMutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
}

impl SignalController {
    /// Assembles a controller from a sampler. The scheduler is built over the
    /// sampler's approaches, so both always agree on names and order.
    pub fn new(
        sampler: OccupancySampler,
        tick_interval: Duration,
        event_capacity: usize,
    ) -> Result<Self, StartupError> {
        let scheduler = SignalScheduler::new(sampler.approach_names(), event_capacity)?;
        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            sampler: Mutex::new(sampler),
            dwell_timer: StdMutex::new(None),
            tick_interval,
        })
    }

    /// Builds a controller with image-sequence sources and the blob counter.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, StartupError> {
        let counter = Arc::new(BlobCounter::new(config.counter.clone()));
        Self::from_config_with_counter(config, counter)
    }

    /// Builds a controller with image-sequence sources and a caller-supplied counter.
    pub fn from_config_with_counter(
        config: &ControllerConfig,
        counter: Arc<dyn VehicleCounter>,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let mut feeds = Vec::with_capacity(config.approaches.len());
        for approach in &config.approaches {
            let source = ImageSequenceSource::open(&approach.source).map_err(|source| {
                StartupError::Source {
                    approach: approach.name.clone(),
                    source,
                }
            })?;
            if source.is_empty() {
                warn!(approach = %approach.name, "frame source has no frames yet");
            }
            feeds.push(ApproachFeed::new(approach.name.clone(), Box::new(source)));
        }

        let store = CaptureStore::open(&config.capture_dir)?;
        let sampler = OccupancySampler::new(feeds, counter, store);
        info!(
            approaches = config.approaches.len(),
            tick_ms = config.tick_interval_ms,
            capture_dir = %config.capture_dir.display(),
            "controller ready"
        );
        Self::new(sampler, config.tick_interval(), config.event_capacity)
    }

    /// Samples every approach and seeds the rotation from the result.
    ///
    /// When an approach is chosen the dwell timer restarts for it. When no
    /// approach has traffic the rotation, and its timer, carry on unchanged.
    pub async fn run_cycle(&self) -> Result<SignalState, ScheduleError> {
        let snapshot = {
            let sampler = self.sampler.lock().await;
            sampler.sample().await
        };
        let reseeds = snapshot.first_occupied().is_some();

        let mut scheduler = self.scheduler.lock().await;
        let state = scheduler.activate(snapshot).inspect_err(|err| {
            warn!(error = %err, "snapshot rejected");
        })?;

        // Still holding the scheduler lock, so no stale tick can land between
        // the new activation and the timer swap.
        if reseeds {
            self.start_dwell_timer();
        }
        Ok(state)
    }

    /// Grabs and stores a frame for every approach without touching the rotation.
    pub async fn capture_frames(&self) -> Vec<CapturedFrame> {
        let sampler = self.sampler.lock().await;
        let captured = sampler.capture().await;
        info!(
            stored = captured.iter().filter(|c| c.stored_at.is_some()).count(),
            approaches = captured.len(),
            "frames captured"
        );
        captured
    }

    pub async fn state(&self) -> SignalState {
        self.scheduler.lock().await.state()
    }

    pub async fn dwell_elapsed(&self) -> Option<Duration> {
        self.scheduler.lock().await.dwell_elapsed()
    }

    pub async fn green_map(&self) -> Vec<(String, bool)> {
        self.scheduler.lock().await.green_map()
    }

    pub async fn occupancy_map(&self) -> Vec<(String, u32)> {
        self.scheduler.lock().await.occupancy_map()
    }

    /// Both read accessors taken under one lock, so they describe the same moment.
    pub async fn board(&self) -> SignalBoard {
        let scheduler = self.scheduler.lock().await;
        SignalBoard::new(&scheduler.green_map(), &scheduler.occupancy_map())
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.scheduler.lock().await.subscribe()
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Stops the dwell timer. The rotation freezes where it is.
    pub fn shutdown(&self) {
        if let Some(timer) = self.take_timer() {
            timer.abort();
            debug!("dwell timer stopped");
        }
    }

    fn start_dwell_timer(&self) {
        let scheduler = Arc::clone(&self.scheduler);
        let period = self.tick_interval;

        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                scheduler.lock().await.tick();
            }
        });

        let mut slot = self.dwell_timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
    }

    fn take_timer(&self) -> Option<JoinHandle<()>> {
        self.dwell_timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Drop for SignalController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
