pub mod approach;
pub mod blob_detector;
pub mod capture_store;
pub mod frame_source;
pub mod heatmap;
pub mod rotation;
pub mod sampler;
pub mod scheduler;
pub mod snapshot;
pub mod vehicle_counter;
