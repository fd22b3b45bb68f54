//! Core types for the rasterizer

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::RenderError;
use super::math::Vec3;
use super::pose::Pose;

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255, a: 255 };
    pub const CYAN: Color = Color { r: 0, g: 255, b: 255, a: 255 };
    pub const MAGENTA: Color = Color { r: 255, g: 0, b: 255, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };

    /// Drawn where a lit face points away from the light
    pub const UNLIT_MARKER: Color = Color { r: 150, g: 0, b: 0, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color with random RGB channels
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::new(rng.random(), rng.random(), rng.random())
    }

    /// Scale RGB by `intensity`, clamped to the channel range. Alpha is kept.
    pub fn shade(self, intensity: f64) -> Self {
        let scale = |c: u8| (c as f64 * intensity).clamp(0.0, 255.0) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
            a: self.a,
        }
    }

    /// Weighted average `round(sum(w * c) / sum(w))`.
    ///
    /// Weights need not sum to one. Alpha is forced opaque unless
    /// `blend_alpha` is set. Falls back to the first color when the weights
    /// sum to zero.
    pub fn interpolate(colors: &[Color], weights: &[f64], blend_alpha: bool) -> Color {
        let total: f64 = weights.iter().take(colors.len()).sum();
        if total == 0.0 || !total.is_finite() {
            return colors.first().copied().unwrap_or(Color::BLACK);
        }
        let mut acc = [0.0f64; 4];
        for (c, w) in colors.iter().zip(weights) {
            let n = w / total;
            acc[0] += n * c.r as f64;
            acc[1] += n * c.g as f64;
            acc[2] += n * c.b as f64;
            acc[3] += n * c.a as f64;
        }
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Color {
            r: channel(acc[0]),
            g: channel(acc[1]),
            b: channel(acc[2]),
            a: if blend_alpha { channel(acc[3]) } else { 255 },
        }
    }

    /// Convert to [u8; 4] for framebuffer
    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Diffuse texture (array of colors, row 0 at the top)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Color>,
    pub name: String,
}

impl Texture {
    /// Load a texture from any image file the `image` crate can decode
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, image::ImageError> {
        let path = path.as_ref();
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels: Vec<Color> = rgba
            .pixels()
            .map(|p| Color::with_alpha(p[0], p[1], p[2], p[3]))
            .collect();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Nearest-neighbour sample. `v` runs bottom-up; coordinates wrap.
    pub fn sample(&self, u: f64, v: f64) -> Color {
        if self.width == 0 || self.height == 0 {
            return Color::WHITE;
        }
        let tx = ((u * self.width as f64).floor() as i64).rem_euclid(self.width as i64) as usize;
        let ty = (((1.0 - v) * self.height as f64).floor() as i64).rem_euclid(self.height as i64) as usize;
        self.pixels[ty * self.width + tx]
    }
}

/// Directional light
#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    /// Kept for reference; a directional light ignores its position
    pub pose: Pose,
    direction: Vec3,
    pub color: Color,
}

impl Light {
    pub fn new(name: &str, pose: Pose, direction: Vec3, color: Color) -> Result<Self, RenderError> {
        let direction = direction.normalize();
        if direction == Vec3::ZERO || !direction.is_finite() {
            return Err(RenderError::InvalidLight(format!(
                "light '{}' has no usable direction",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            pose,
            direction,
            color,
        })
    }

    /// Unit-length direction
    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

/// White, shining along world +Y
impl Default for Light {
    fn default() -> Self {
        Self {
            name: "default_light".to_string(),
            pose: Pose::IDENTITY,
            direction: Vec3::Y,
            color: Color::WHITE,
        }
    }
}

/// How faces are drawn; one mode per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Triangle edges only
    Wireframe,
    /// Filled, one random color per triangle, unlit
    FacesNoLightRandomColors,
    /// Filled and lit, white base color
    FacesNoMat,
    /// Filled and lit, diffuse texture when the mesh has one
    #[default]
    Faces,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        RenderMode::Wireframe,
        RenderMode::FacesNoLightRandomColors,
        RenderMode::FacesNoMat,
        RenderMode::Faces,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RenderMode::Wireframe => "wireframe",
            RenderMode::FacesNoLightRandomColors => "random-colors",
            RenderMode::FacesNoMat => "no-material",
            RenderMode::Faces => "faces",
        }
    }

    pub fn from_index(i: usize) -> Option<RenderMode> {
        RenderMode::ALL.get(i).copied()
    }

    pub fn from_label(label: &str) -> Option<RenderMode> {
        RenderMode::ALL.iter().copied().find(|m| m.label() == label)
    }

    /// Whether the mode consults the scene light
    pub fn is_lit(&self) -> bool {
        matches!(self, RenderMode::FacesNoMat | RenderMode::Faces)
    }
}

/// Renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub mode: RenderMode,
    pub show_world_axes: bool,
    pub show_object_axes: bool,
    /// Length of the per-object axis gizmo in object units
    pub object_axis_length: f64,
    pub background: Color,
    /// Split each triangle's rows across the rayon pool
    pub parallel: bool,
    /// Boxes smaller than this many pixels are rasterized serially
    pub parallel_threshold: usize,
    /// Seed for the random-colors mode, reapplied every frame
    pub seed: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::Faces,
            show_world_axes: true,
            show_object_axes: true,
            object_axis_length: 0.25,
            background: Color::BLACK,
            parallel: true,
            parallel_threshold: 4096,
            seed: 0,
        }
    }
}
