//! softraster: a CPU software rasterizer
//!
//! - `rasterizer`: poses, the pinhole camera and the renderer with its color,
//!   depth and instance-id buffers
//! - `world`: models, scenes, RON scene files and PNG export

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod rasterizer;
pub mod world;
