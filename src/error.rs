// THEORY:
// Every failure the controller can meet falls into one of a few families, and
// each family has a fixed policy. Configuration errors are fatal at startup.
// Frame, detection and capture errors are absorbed by the sampler and turn
// into a zero count for one approach in one cycle. Schedule errors reject a
// malformed snapshot without touching the rotation. Keeping these as distinct
// enums lets every call site see which policy applies from the type alone.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no approaches configured")]
    Empty,

    #[error("{names} approach names but {sources} frame sources")]
    Mismatched { names: usize, sources: usize },

    #[error("approach name {0:?} is configured more than once")]
    DuplicateName(String),

    #[error("approach name must not be blank")]
    BlankName,

    #[error("approach name {0:?} cannot be used as a capture file name")]
    UnsafeName(String),

    #[error("tick interval must be greater than zero")]
    InvalidInterval,

    #[error("invalid counter setting: {0}")]
    InvalidCounter(String),

    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A frame source failed to produce a frame.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame source {0} has no frames")]
    Unavailable(String),

    #[error("cannot open frame source {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The vehicle counter could not produce a count for a frame.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("frame {width}x{height} is smaller than one {chunk_size}px chunk")]
    FrameTooSmall {
        width: u32,
        height: u32,
        chunk_size: u32,
    },

    #[error("detection task failed: {0}")]
    Task(String),

    #[error("counter rejected frame: {0}")]
    Rejected(String),
}

/// Writing or reading the capture store failed.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("capture encode/decode at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A scheduling request that does not fit the configured approaches.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("snapshot does not match configured approaches: {0}")]
    SnapshotMismatch(String),
}

/// Anything that stops a controller from being assembled at startup.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("approach {approach}: {source}")]
    Source {
        approach: String,
        #[source]
        source: FrameError,
    },

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
