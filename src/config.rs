//! Startup configuration.
//!
//! The controller is configured once, from a TOML file, and the configuration
//! is never reloaded. Everything except the approach list has a default.

use crate::core_modules::vehicle_counter::CounterConfig;
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One monitored approach and where its frames come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApproachConfig {
    pub name: String,
    /// An image file or a directory of frames.
    pub source: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerConfig {
    #[serde(rename = "approach", default)]
    pub approaches: Vec<ApproachConfig>,
    /// How long each approach holds green before the rotation moves on.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,
    /// Buffer size of the signal event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub counter: CounterConfig,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from("Captured_Frames")
}

fn default_event_capacity() -> usize {
    16
}

impl ControllerConfig {
    /// Loads and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from parallel lists of approach names and frame
    /// sources, with every other setting at its default.
    pub fn from_lists<N, P>(names: Vec<N>, sources: Vec<P>) -> Result<Self, ConfigError>
    where
        N: Into<String>,
        P: Into<PathBuf>,
    {
        if names.len() != sources.len() {
            return Err(ConfigError::Mismatched {
                names: names.len(),
                sources: sources.len(),
            });
        }
        let approaches = names
            .into_iter()
            .zip(sources)
            .map(|(name, source)| ApproachConfig {
                name: name.into(),
                source: source.into(),
            })
            .collect();
        let config = Self {
            approaches,
            tick_interval_ms: default_tick_interval_ms(),
            capture_dir: default_capture_dir(),
            event_capacity: default_event_capacity(),
            counter: CounterConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.approaches.is_empty() {
            return Err(ConfigError::Empty);
        }
        let mut seen = HashSet::new();
        for approach in &self.approaches {
            if approach.name.trim().is_empty() {
                return Err(ConfigError::BlankName);
            }
            // Names double as capture file names under `capture_dir`.
            if approach.name.contains(['/', '\\']) || approach.name.contains("..") {
                return Err(ConfigError::UnsafeName(approach.name.clone()));
            }
            if !seen.insert(approach.name.as_str()) {
                return Err(ConfigError::DuplicateName(approach.name.clone()));
            }
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.counter.chunk_size == 0 {
            return Err(ConfigError::InvalidCounter("chunk_size must be at least 1".into()));
        }
        if !(self.counter.heat_threshold > 0.0) {
            return Err(ConfigError::InvalidCounter("heat_threshold must be positive".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn approach_names(&self) -> Vec<String> {
        self.approaches.iter().map(|a| a.name.clone()).collect()
    }
}
