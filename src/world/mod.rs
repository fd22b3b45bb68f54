//! World module - what gets rendered
//!
//! - Models loaded from Wavefront OBJ files, with optional diffuse textures
//! - Scenes owning models, cameras, lights and the renderer
//! - RON scene files and PNG export of finished frames

mod config;
mod model;
mod output;
mod scene;

pub use config::*;
pub use model::*;
pub use output::*;
pub use scene::*;
