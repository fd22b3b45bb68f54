//! Error type for the rendering core

/// Failures the rendering core reports instead of drawing garbage
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Camera parameters that would yield a degenerate projection
    InvalidCameraConfiguration(String),
    /// A face references a vertex or texture coordinate that does not exist
    IndexOutOfRange { index: usize, len: usize },
    /// Light direction without length
    InvalidLight(String),
    /// Structurally broken mesh (e.g. a face with fewer than 3 indices)
    InvalidMesh(String),
    UnknownCamera(String),
    /// `Scene::draw` before `Scene::load`
    SceneNotLoaded,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::InvalidCameraConfiguration(msg) => {
                write!(f, "Invalid camera configuration: {}", msg)
            }
            RenderError::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range for {} elements", index, len)
            }
            RenderError::InvalidLight(msg) => write!(f, "Invalid light: {}", msg),
            RenderError::InvalidMesh(msg) => write!(f, "Invalid mesh: {}", msg),
            RenderError::UnknownCamera(name) => write!(f, "Unknown camera '{}'", name),
            RenderError::SceneNotLoaded => write!(f, "Scene has not been loaded"),
        }
    }
}

impl std::error::Error for RenderError {}
