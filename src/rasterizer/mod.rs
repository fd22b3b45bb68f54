//! CPU software rasterizer
//!
//! Features:
//! - Pinhole camera with near/far culling and look-at locking
//! - Barycentric scan conversion with a strictly-less depth test
//! - Per-pixel instance ids for picking and segmentation
//! - Lambert shading from one directional light, nearest-neighbour textures
//! - Wireframe and axis overlays drawn with Bresenham lines

mod camera;
mod error;
mod geometry;
mod math;
mod mesh;
mod pose;
mod render;
mod types;

pub use camera::*;
pub use error::*;
pub use geometry::*;
pub use math::*;
pub use mesh::*;
pub use pose::*;
pub use render::*;
pub use types::*;
