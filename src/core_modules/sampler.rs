// THEORY:
// The `OccupancySampler` turns "what do the cameras see right now" into an
// `OccupancySnapshot`. It is the leaf of the system: it owns the frame source
// of every approach, the vehicle counter and the capture store, and keeps no
// memory from one sample to the next.
//
// A sample runs in two stages:
// 1.  **Capture**: one frame per approach. An exhausted or failing source is
//     rewound and retried once; after that the approach simply has no frame
//     this cycle. Each frame is persisted to the capture store under the
//     approach name.
// 2.  **Count**: the stored frames are counted and the results are put back
//     in configured order.
//
// Both stages do their decoding, encoding and counting on blocking worker
// threads, at most one per CPU at a time, so the async runtime only waits.
//
// Nothing in a sample can fail as a whole. Every per-approach problem (no
// frame, unreadable capture, counter error) degrades that approach's count
// to zero and is logged.

use crate::core_modules::capture_store::CaptureStore;
use crate::core_modules::frame_source::{FrameSource, acquire_frame};
use crate::core_modules::snapshot::{OccupancyReading, OccupancySnapshot};
use crate::core_modules::vehicle_counter::VehicleCounter;
use crate::error::DetectionError;
use futures::future::join_all;
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// One approach's camera.
pub struct ApproachFeed {
    pub name: String,
    pub source: Box<dyn FrameSource>,
}

impl ApproachFeed {
    pub fn new(name: impl Into<String>, source: Box<dyn FrameSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

/// The outcome of capturing one approach.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub name: String,
    /// `None` when the source had nothing even after a rewind.
    pub frame: Option<RgbaImage>,
    /// Where the frame was persisted, if persisting succeeded.
    pub stored_at: Option<PathBuf>,
}

/// A feed whose source can be lent to a blocking worker.
struct FeedSlot {
    name: String,
    source: Arc<Mutex<Box<dyn FrameSource>>>,
}

pub struct OccupancySampler {
    feeds: Vec<FeedSlot>,
    counter: Arc<dyn VehicleCounter>,
    store: Arc<CaptureStore>,
    permits: Arc<Semaphore>,
}

impl OccupancySampler {
    pub fn new(feeds: Vec<ApproachFeed>, counter: Arc<dyn VehicleCounter>, store: CaptureStore) -> Self {
        let workers = num_cpus::get().max(1);
        let feeds = feeds
            .into_iter()
            .map(|feed| FeedSlot {
                name: feed.name,
                source: Arc::new(Mutex::new(feed.source)),
            })
            .collect();
        Self {
            feeds,
            counter,
            store: Arc::new(store),
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn approach_names(&self) -> Vec<String> {
        self.feeds.iter().map(|f| f.name.clone()).collect()
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Grabs and persists one frame per approach without counting.
    pub async fn capture(&self) -> Vec<CapturedFrame> {
        join_all(self.feeds.iter().map(|slot| self.capture_one(slot))).await
    }

    /// Captures and counts every approach once.
    pub async fn sample(&self) -> OccupancySnapshot {
        // --- 1. Capture ---
        let captures = self.capture().await;

        // --- 2. Count ---
        let counts = join_all(captures.into_iter().map(|capture| self.count_capture(capture))).await;

        let snapshot = OccupancySnapshot::new(counts);
        info!(
            vehicles = snapshot.total_vehicles(),
            approaches = snapshot.len(),
            "occupancy sampled"
        );
        snapshot
    }

    async fn capture_one(&self, slot: &FeedSlot) -> CapturedFrame {
        let name = slot.name.clone();
        let source = Arc::clone(&slot.source);
        let store = Arc::clone(&self.store);
        let job_name = name.clone();

        let job = move || {
            // A worker that panicked mid-read leaves the source usable.
            let mut source = source.lock().unwrap_or_else(PoisonError::into_inner);
            let frame = acquire_frame(&mut **source);
            let stored_at = frame.as_ref().and_then(|f| match store.persist(&job_name, f) {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(approach = %job_name, error = %err, "could not persist capture");
                    None
                }
            });
            (frame, stored_at)
        };

        match on_worker(&self.permits, job).await {
            Ok((frame, stored_at)) => CapturedFrame {
                name,
                frame,
                stored_at,
            },
            Err(err) => {
                warn!(approach = %name, error = %err, "capture task failed");
                CapturedFrame {
                    name,
                    frame: None,
                    stored_at: None,
                }
            }
        }
    }

    async fn count_capture(&self, capture: CapturedFrame) -> OccupancyReading {
        let CapturedFrame {
            name,
            frame,
            stored_at,
        } = capture;

        let Some(frame) = frame else {
            return OccupancyReading { name, count: 0 };
        };

        let counter = Arc::clone(&self.counter);
        let store = Arc::clone(&self.store);
        let job_name = name.clone();

        let job = move || {
            let frame = match stored_at {
                Some(_) => store.load(&job_name).unwrap_or_else(|err| {
                    warn!(approach = %job_name, error = %err, "stored capture unreadable, counting live frame");
                    frame
                }),
                None => frame,
            };
            counter.count(&frame)
        };

        let result = on_worker(&self.permits, job)
            .await
            .map_err(DetectionError::Task)
            .and_then(|counted| counted);

        let count = match result {
            Ok(count) => count,
            Err(err) => {
                warn!(approach = %name, error = %err, "detection failed, treating approach as empty");
                0
            }
        };
        debug!(approach = %name, count, "approach counted");
        OccupancyReading { name, count }
    }
}

/// Runs `job` on the blocking pool once a worker permit is free.
async fn on_worker<T, F>(permits: &Arc<Semaphore>, job: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let _permit = Arc::clone(permits)
        .acquire_owned()
        .await
        .map_err(|e| e.to_string())?;
    tokio::task::spawn_blocking(job).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrameError;
    use image::Rgba;
    use std::collections::HashMap;

    /// Serves the same frame every time, or nothing at all.
    struct FixedSource {
        frame: Option<RgbaImage>,
        rewinds: Arc<std::sync::Mutex<u32>>,
    }

    impl FrameSource for FixedSource {
        fn next_frame(&mut self) -> Result<Option<RgbaImage>, FrameError> {
            Ok(self.frame.clone())
        }
        fn rewind(&mut self) {
            *self.rewinds.lock().unwrap() += 1;
        }
        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    /// Reads the red channel in steps of 50 as the count. A dark frame means "fail".
    /// Rounds because captures round-trip through a lossy encoder.
    struct RedChannelCounter;

    impl VehicleCounter for RedChannelCounter {
        fn count(&self, frame: &RgbaImage) -> Result<u32, DetectionError> {
            let red = frame.get_pixel(4, 4)[0];
            if red < 25 {
                return Err(DetectionError::Rejected("model crashed".to_string()));
            }
            Ok((red as f32 / 50.0).round() as u32)
        }
    }

    fn frame(red: u8) -> RgbaImage {
        RgbaImage::from_pixel(8, 8, Rgba([red, 0, 0, 255]))
    }

    fn feed(name: &str, frame: Option<RgbaImage>) -> (ApproachFeed, Arc<std::sync::Mutex<u32>>) {
        let rewinds = Arc::new(std::sync::Mutex::new(0));
        let source = FixedSource {
            frame,
            rewinds: Arc::clone(&rewinds),
        };
        (ApproachFeed::new(name, Box::new(source)), rewinds)
    }

    #[tokio::test]
    async fn failures_degrade_to_zero_in_configured_order() {
        let dir = tempfile::tempdir().unwrap();
        let (north, _) = feed("NORTH", Some(frame(200)));
        let (south, _) = feed("SOUTH", Some(frame(0)));
        let (east, east_rewinds) = feed("EAST", None);
        let (west, _) = feed("WEST", Some(frame(100)));

        let sampler = OccupancySampler::new(
            vec![north, south, east, west],
            Arc::new(RedChannelCounter),
            CaptureStore::open(dir.path()).unwrap(),
        );
        let snapshot = sampler.sample().await;

        let counts: Vec<(String, u32)> = snapshot
            .readings()
            .iter()
            .map(|r| (r.name.clone(), r.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("NORTH".to_string(), 4),
                ("SOUTH".to_string(), 0),
                ("EAST".to_string(), 0),
                ("WEST".to_string(), 2),
            ]
        );
        assert_eq!(*east_rewinds.lock().unwrap(), 1);
    }

    /// Remembers which thread pulled its frame.
    struct ThreadRecordingSource {
        reader: Arc<std::sync::Mutex<Option<std::thread::ThreadId>>>,
    }

    impl FrameSource for ThreadRecordingSource {
        fn next_frame(&mut self) -> Result<Option<RgbaImage>, FrameError> {
            *self.reader.lock().unwrap() = Some(std::thread::current().id());
            Ok(Some(frame(100)))
        }
        fn rewind(&mut self) {}
        fn describe(&self) -> String {
            "thread recording".to_string()
        }
    }

    #[tokio::test]
    async fn frames_are_read_off_the_async_thread() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(std::sync::Mutex::new(None));
        let source = ThreadRecordingSource {
            reader: Arc::clone(&reader),
        };
        let sampler = OccupancySampler::new(
            vec![ApproachFeed::new("NORTH", Box::new(source))],
            Arc::new(RedChannelCounter),
            CaptureStore::open(dir.path()).unwrap(),
        );

        let snapshot = sampler.sample().await;
        assert_eq!(snapshot.count_for("NORTH"), Some(2));
        let reader = reader.lock().unwrap().expect("source was read");
        assert_ne!(reader, std::thread::current().id());
    }

    #[tokio::test]
    async fn capture_persists_each_available_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (north, _) = feed("NORTH", Some(frame(150)));
        let (east, _) = feed("EAST", None);
        let sampler = OccupancySampler::new(
            vec![north, east],
            Arc::new(RedChannelCounter),
            CaptureStore::open(dir.path()).unwrap(),
        );

        let captured: HashMap<String, CapturedFrame> = sampler
            .capture()
            .await
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();

        assert!(captured["NORTH"].stored_at.as_ref().is_some_and(|p| p.exists()));
        assert!(captured["EAST"].frame.is_none());
        assert!(captured["EAST"].stored_at.is_none());
        assert!(sampler.store().load("NORTH").is_ok());
        assert_eq!(sampler.approach_names(), vec!["NORTH", "EAST"]);
    }
}
