// THEORY:
// The vehicle counter is the opaque "how many cars are in this picture"
// collaborator. The scheduler never sees how the number is produced, only
// that it is a non-negative integer or an error. That seam is the
// `VehicleCounter` trait, so a real detection model can replace the built-in
// heuristic without touching anything else.
//
// `BlobCounter` is the built-in heuristic: heatmap against the scene
// background, blob detection, then a size filter that drops specks too small
// to be a vehicle.

use crate::core_modules::blob_detector::find_blobs;
use crate::core_modules::heatmap::{Background, ChunkHeatmap};
use crate::error::DetectionError;
use image::RgbaImage;
use serde::Deserialize;

/// Counts vehicles in one frame.
pub trait VehicleCounter: Send + Sync {
    fn count(&self, frame: &RgbaImage) -> Result<u32, DetectionError>;
}

/// Tunables for `BlobCounter`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Side of a square chunk in pixels.
    pub chunk_size: u32,
    /// Minimum luminance distance from the background for a chunk to count as occupied.
    pub heat_threshold: f64,
    /// Blobs smaller than this many chunks are treated as noise.
    pub min_blob_chunks: usize,
    /// Fixed road luminance. When unset, the median chunk luminance of each frame is used.
    pub background_luminance: Option<f64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            heat_threshold: 30.0,
            min_blob_chunks: 2,
            background_luminance: None,
        }
    }
}

pub struct BlobCounter {
    config: CounterConfig,
}

impl BlobCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self { config }
    }

    fn background(&self) -> Background {
        match self.config.background_luminance {
            Some(level) => Background::Fixed(level),
            None => Background::Median,
        }
    }
}

impl VehicleCounter for BlobCounter {
    fn count(&self, frame: &RgbaImage) -> Result<u32, DetectionError> {
        let heatmap = ChunkHeatmap::from_frame(frame, self.config.chunk_size, self.background())
            .ok_or(DetectionError::FrameTooSmall {
                width: frame.width(),
                height: frame.height(),
                chunk_size: self.config.chunk_size,
            })?;

        let vehicles = find_blobs(&heatmap, self.config.heat_threshold)
            .into_iter()
            .filter(|blob| blob.size_in_chunks >= self.config.min_blob_chunks)
            .count();
        Ok(vehicles as u32)
    }
}
