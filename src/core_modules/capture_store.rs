// THEORY:
// The capture store keeps the most recent frame of every approach on disk,
// one file per approach name. The sampler writes it and the detection step of
// the same sample reads it back; audit and display tooling may read it at any
// time. Writes go to a temporary sibling first and are renamed into place, so
// a reader never observes a half-written frame.

use crate::error::CaptureError;
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

const CAPTURE_EXTENSION: &str = "jpg";

pub struct CaptureStore {
    root: PathBuf,
}

impl CaptureStore {
    /// Opens (and creates, if needed) the capture directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| CaptureError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the frame for `approach` lives.
    pub fn path_for(&self, approach: &str) -> PathBuf {
        self.root.join(format!("{approach}.{CAPTURE_EXTENSION}"))
    }

    /// Replaces the stored frame for `approach`.
    pub fn persist(&self, approach: &str, frame: &RgbaImage) -> Result<PathBuf, CaptureError> {
        let target = self.path_for(approach);
        let staging = self.root.join(format!(".{approach}.{CAPTURE_EXTENSION}.tmp"));

        // JPEG has no alpha channel.
        let rgb = image::DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
        rgb.save_with_format(&staging, ImageFormat::Jpeg)
            .map_err(|source| CaptureError::Image {
                path: staging.clone(),
                source,
            })?;

        fs::rename(&staging, &target).map_err(|source| CaptureError::Io {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    /// Reads back the stored frame for `approach`.
    pub fn load(&self, approach: &str) -> Result<RgbaImage, CaptureError> {
        let path = self.path_for(approach);
        let frame = image::open(&path).map_err(|source| CaptureError::Image {
            path: path.clone(),
            source,
        })?;
        Ok(frame.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn persist_then_load_replaces_previous_frame() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path().join("Captured_Frames")).unwrap();

        let dark = RgbaImage::from_pixel(16, 16, Rgba([10, 10, 10, 255]));
        let light = RgbaImage::from_pixel(16, 16, Rgba([240, 240, 240, 255]));

        let path = store.persist("NORTH", &dark).unwrap();
        assert_eq!(path, store.path_for("NORTH"));
        store.persist("NORTH", &light).unwrap();

        let loaded = store.load("NORTH").unwrap();
        assert_eq!(loaded.dimensions(), (16, 16));
        // Lossy encoding, so only check it is the light frame.
        assert!(loaded.get_pixel(8, 8)[0] > 200);

        let leftovers: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["NORTH.jpg".to_string()]);
    }

    #[test]
    fn loading_a_missing_capture_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::open(dir.path()).unwrap();
        assert!(matches!(store.load("EAST"), Err(CaptureError::Image { .. })));
    }
}
