// THEORY:
// A `FrameSource` is the camera for one approach. The controller only needs
// two things from it: the next frame, if there is one, and a way to start
// over when the stream runs dry. Anything that can play that role (a video
// decoder, a network stream, a folder of stills) implements the trait.
//
// `ImageSequenceSource` is the built-in implementation. It treats a single
// image file, or a directory of image files sorted by name, as a looping
// stream of RGBA frames decoded with the `image` crate.

use crate::error::FrameError;
use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// A restartable stream of frames for one approach.
pub trait FrameSource: Send {
    /// Returns the next frame, or `Ok(None)` at the end of the stream.
    fn next_frame(&mut self) -> Result<Option<RgbaImage>, FrameError>;

    /// Moves the stream back to its first frame.
    fn rewind(&mut self);

    /// A human readable description, used in logs.
    fn describe(&self) -> String;
}

/// Frames read from a still image or a directory of stills.
pub struct ImageSequenceSource {
    origin: PathBuf,
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceSource {
    /// Opens `path`, which may be one image file or a directory of frames.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let origin = path.as_ref().to_path_buf();
        let open_err = |source| FrameError::Open {
            path: origin.clone(),
            source,
        };

        let frames = if fs::metadata(&origin).map_err(open_err)?.is_dir() {
            let mut frames: Vec<PathBuf> = fs::read_dir(&origin)
                .map_err(open_err)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_frame_file(p))
                .collect();
            frames.sort();
            frames
        } else {
            vec![origin.clone()]
        };

        debug!(source = %origin.display(), frames = frames.len(), "opened image sequence");
        Ok(Self {
            origin,
            frames,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbaImage>, FrameError> {
        let Some(path) = self.frames.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let frame = image::open(path).map_err(|source| FrameError::Decode {
            path: path.clone(),
            source,
        })?;
        Ok(Some(frame.to_rgba8()))
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn describe(&self) -> String {
        self.origin.display().to_string()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

/// Pulls one frame, rewinding and retrying once when the stream is exhausted
/// or the read fails. `None` means the approach has no frame this cycle.
pub fn acquire_frame(source: &mut dyn FrameSource) -> Option<RgbaImage> {
    match source.next_frame() {
        Ok(Some(frame)) => return Some(frame),
        Ok(None) => debug!(source = %source.describe(), "end of stream, rewinding"),
        Err(err) => debug!(source = %source.describe(), error = %err, "read failed, rewinding"),
    }

    source.rewind();
    match source.next_frame() {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            let err = FrameError::Unavailable(source.describe());
            warn!(error = %err, "frame unavailable after rewind");
            None
        }
        Err(err) => {
            warn!(source = %source.describe(), error = %err, "frame unavailable after rewind");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        RgbaImage::from_pixel(4, 4, Rgba([shade, shade, shade, 255]))
            .save(dir.join(name))
            .expect("write test frame");
    }

    #[test]
    fn directory_frames_play_in_name_order_and_loop() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "002.png", 20);
        write_frame(dir.path(), "001.png", 10);
        fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = acquire_frame(&mut source).unwrap();
        let second = acquire_frame(&mut source).unwrap();
        let looped = acquire_frame(&mut source).unwrap();
        assert_eq!(first.get_pixel(0, 0)[0], 10);
        assert_eq!(second.get_pixel(0, 0)[0], 20);
        assert_eq!(looped.get_pixel(0, 0)[0], 10);
    }

    #[test]
    fn single_file_repeats_forever() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "still.png", 77);
        let mut source = ImageSequenceSource::open(dir.path().join("still.png")).unwrap();
        for _ in 0..3 {
            assert_eq!(acquire_frame(&mut source).unwrap().get_pixel(1, 1)[0], 77);
        }
    }

    #[test]
    fn empty_directory_yields_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.is_empty());
        assert!(acquire_frame(&mut source).is_none());
    }

    #[test]
    fn missing_path_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path().join("nope"));
        assert!(matches!(result, Err(FrameError::Open { .. })));
    }

    #[test]
    fn undecodable_frame_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"not really a png").unwrap();
        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(acquire_frame(&mut source).is_none());
    }
}
