// THEORY:
// This is the entry point of the `atlas_signal` library crate. It exposes the
// `SignalController` as the high-level interface to the whole system: give it
// a configuration, call `run_cycle` when an operator says "start", and watch
// the green signal rotate.
//
// The building blocks in `core_modules` stay public so that callers can swap
// in their own frame sources or vehicle counters, or drive the scheduler
// directly without any timers at all.

pub mod config;
pub mod controller;
pub mod core_modules;
pub mod display;
pub mod error;

pub use config::{ApproachConfig, ControllerConfig};
pub use controller::SignalController;
pub use core_modules::frame_source::{FrameSource, ImageSequenceSource};
pub use core_modules::rotation::SignalState;
pub use core_modules::sampler::{ApproachFeed, CapturedFrame, OccupancySampler};
pub use core_modules::scheduler::{SignalEvent, SignalScheduler};
pub use core_modules::snapshot::{OccupancyReading, OccupancySnapshot};
pub use core_modules::vehicle_counter::{BlobCounter, CounterConfig, VehicleCounter};
pub use display::SignalBoard;
