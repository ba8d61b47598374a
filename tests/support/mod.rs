//! Scripted collaborators for driving the controller in tests.

#![allow(dead_code)]

use atlas_signal::core_modules::capture_store::CaptureStore;
use atlas_signal::error::{DetectionError, FrameError};
use atlas_signal::{ApproachFeed, FrameSource, OccupancySampler, VehicleCounter};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Plays a fixed list of frames in a loop. An empty script never yields a frame.
pub struct ScriptedSource {
    frames: Vec<RgbaImage>,
    cursor: usize,
    broken: bool,
}

impl ScriptedSource {
    /// One frame per entry, each encoding `count` vehicles.
    pub fn counts(counts: &[u32]) -> Self {
        Self {
            frames: counts.iter().map(|c| encode_count(*c)).collect(),
            cursor: 0,
            broken: false,
        }
    }

    /// A source whose every read fails.
    pub fn broken() -> Self {
        Self {
            frames: Vec::new(),
            cursor: 0,
            broken: true,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<RgbaImage>, FrameError> {
        if self.broken {
            return Err(FrameError::Unavailable("scripted failure".to_string()));
        }
        let frame = self.frames.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(frame)
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Frames carry their vehicle count in the red channel, 50 levels per vehicle,
/// so the count survives a lossy capture round trip.
pub fn encode_count(count: u32) -> RgbaImage {
    let red = (count * 50).min(250) as u8;
    RgbaImage::from_pixel(16, 16, Rgba([red, 0, 0, 255]))
}

pub struct RedChannelCounter;

impl VehicleCounter for RedChannelCounter {
    fn count(&self, frame: &RgbaImage) -> Result<u32, DetectionError> {
        let red = frame.get_pixel(8, 8)[0];
        Ok((red as f32 / 50.0).round() as u32)
    }
}

/// Fails on every frame.
pub struct CrashingCounter;

impl VehicleCounter for CrashingCounter {
    fn count(&self, _frame: &RgbaImage) -> Result<u32, DetectionError> {
        Err(DetectionError::Rejected("scripted failure".to_string()))
    }
}

pub fn sampler(
    feeds: Vec<(&str, ScriptedSource)>,
    counter: Arc<dyn VehicleCounter>,
    store: &tempfile::TempDir,
) -> OccupancySampler {
    let feeds = feeds
        .into_iter()
        .map(|(name, source)| ApproachFeed::new(name, Box::new(source)))
        .collect();
    OccupancySampler::new(feeds, counter, CaptureStore::open(store.path()).unwrap())
}
