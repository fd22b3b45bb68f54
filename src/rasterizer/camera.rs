//! Pinhole camera: placement, intrinsics, near/far culling and projection

use log::warn;
use serde::{Deserialize, Serialize};

use super::error::RenderError;
use super::math::{Mat3, Mat4, Vec3};
use super::mesh::{Mesh, Object3D};
use super::pose::Pose;

/// Screen position given to vertices outside the near/far range
pub const OUTLIER_SCREEN: Vec3 = Vec3 { x: -1.0, y: -1.0, z: 1.0 };

/// Camera construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub name: String,
    pub pose: Pose,
    /// Horizontal field of view in degrees
    pub h_fov: f64,
    /// (width, height) in pixels
    pub resolution: (u32, u32),
    pub near: f64,
    pub far: f64,
    pub focal: f64,
    /// Reserved; only perspective projection is implemented
    pub orthographic: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            pose: Pose::new(1.5, -1.0, 0.5, 90.0, 0.0, 0.0),
            h_fov: 70.0,
            resolution: (1920, 1080),
            near: 0.01,
            far: 20.0,
            focal: 0.01,
            orthographic: false,
        }
    }
}

/// Vertices after projection and perspective division
#[derive(Debug, Clone, Default)]
pub struct Projection {
    /// (x / z, y / z, camera-space z) per vertex; `OUTLIER_SCREEN` for culled ones
    pub points: Vec<Vec3>,
    /// True where the vertex failed the near/far test
    pub outliers: Vec<bool>,
}

impl Projection {
    pub fn is_outlier(&self, i: usize) -> bool {
        self.outliers.get(i).copied().unwrap_or(true)
    }
}

/// Pinhole camera
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pose: Pose,
    h_fov: f64,
    v_fov: f64,
    width: usize,
    height: usize,
    near: f64,
    far: f64,
    focal: f64,
    orthographic: bool,
    sx: f64,
    sy: f64,
    /// 3x4 intrinsic projection
    projection: [[f64; 4]; 3],
    look_at: Option<Pose>,
    pub visible: bool,
    pub show_axes: bool,
    rig: Option<Mesh>,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self, RenderError> {
        let CameraConfig { name, pose, h_fov, resolution, near, far, focal, orthographic } = config;
        let (width, height) = (resolution.0 as usize, resolution.1 as usize);
        let invalid = |msg: String| Err(RenderError::InvalidCameraConfiguration(format!("{}: {}", name, msg)));

        if width == 0 || height == 0 {
            return invalid(format!("resolution {}x{} has no pixels", width, height));
        }
        if !(focal.is_finite() && focal > 0.0) {
            return invalid(format!("focal length {} must be positive", focal));
        }
        if !(h_fov > 0.0 && h_fov < 180.0) {
            return invalid(format!("horizontal fov {} must be in (0, 180)", h_fov));
        }
        // Linear aspect scaling of the horizontal FOV
        let v_fov = h_fov * height as f64 / width as f64;
        if v_fov >= 180.0 {
            return invalid(format!("vertical fov {} must be below 180", v_fov));
        }
        // Projection divides by z, so the near plane must sit in front of the eye
        if !(near.is_finite() && far.is_finite() && near > 0.0 && near < far) {
            return invalid(format!("clip range [{}, {}] must satisfy 0 < near < far", near, far));
        }
        if orthographic {
            warn!("Camera '{}': orthographic projection is not implemented, using perspective", name);
        }

        let sx = 2.0 * focal * (h_fov.to_radians() / 2.0).tan() / width as f64;
        let sy = 2.0 * focal * (v_fov.to_radians() / 2.0).tan() / height as f64;
        let projection = [
            [focal / sx, 0.0, width as f64 / 2.0, 0.0],
            [0.0, focal / sy, height as f64 / 2.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ];

        let rig = rig_mesh(width as f64 / height as f64);
        Ok(Self {
            name,
            pose,
            h_fov,
            v_fov,
            width,
            height,
            near,
            far,
            focal,
            orthographic,
            sx,
            sy,
            projection,
            look_at: None,
            visible: true,
            show_axes: true,
            rig,
        })
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Replace the placement; re-locks onto the look-at target if one is set
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.relock();
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn h_fov(&self) -> f64 {
        self.h_fov
    }

    pub fn v_fov(&self) -> f64 {
        self.v_fov
    }

    pub fn near(&self) -> f64 {
        self.near
    }

    pub fn far(&self) -> f64 {
        self.far
    }

    pub fn focal(&self) -> f64 {
        self.focal
    }

    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    /// Pixel scale factors (sx, sy)
    pub fn pixel_scale(&self) -> (f64, f64) {
        (self.sx, self.sy)
    }

    pub fn projection_matrix(&self) -> &[[f64; 4]; 3] {
        &self.projection
    }

    /// Local +Z axis in world space
    pub fn forward(&self) -> Vec3 {
        self.pose.rotation_matrix().column(2)
    }

    /// Local -Y axis in world space (image rows grow along +Y)
    pub fn up(&self) -> Vec3 {
        -self.pose.rotation_matrix().column(1)
    }

    /// World vertices into camera-local space
    pub fn world_to_camera_space(&self, vertices: &[Vec3]) -> Vec<Vec3> {
        let inv: Mat4 = self.pose.to_matrix().rigid_inverse();
        vertices.iter().map(|&v| inv.transform_point(v)).collect()
    }

    /// Apply the intrinsic matrix to camera-space vertices.
    ///
    /// Vertices with z outside [near, far] are replaced by the origin before
    /// projection and their indices returned in ascending order. The result
    /// is homogeneous: x and y still need dividing by the third coordinate,
    /// which is the camera-space z.
    pub fn cull_and_project(&self, vertices: &[Vec3]) -> (Vec<Vec3>, Vec<usize>) {
        let p = &self.projection;
        let mut outliers = Vec::new();
        let projected = vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let v = if v.z < self.near || v.z > self.far || !v.is_finite() {
                    outliers.push(i);
                    Vec3::ZERO
                } else {
                    v
                };
                Vec3::new(
                    p[0][0] * v.x + p[0][1] * v.y + p[0][2] * v.z + p[0][3],
                    p[1][0] * v.x + p[1][1] * v.y + p[1][2] * v.z + p[1][3],
                    p[2][0] * v.x + p[2][1] * v.y + p[2][2] * v.z + p[2][3],
                )
            })
            .collect();
        (projected, outliers)
    }

    /// World vertices to screen space, with perspective division done
    pub fn project(&self, world: &[Vec3]) -> Projection {
        let (homogeneous, outlier_indices) = self.cull_and_project(&self.world_to_camera_space(world));
        let mut outliers = vec![false; homogeneous.len()];
        for i in outlier_indices {
            outliers[i] = true;
        }
        let points = homogeneous
            .iter()
            .zip(&outliers)
            .map(|(h, &out)| if out { OUTLIER_SCREEN } else { Vec3::new(h.x / h.z, h.y / h.z, h.z) })
            .collect();
        Projection { points, outliers }
    }

    pub fn look_at_target(&self) -> Option<Pose> {
        self.look_at
    }

    /// Lock orientation onto `target` (or release it). Applied immediately.
    pub fn set_look_at(&mut self, target: Option<Pose>) {
        self.look_at = target;
        self.relock();
    }

    /// Turn the camera so its forward axis points at `target`.
    ///
    /// The forward axis is matched exactly; the camera's up axis is then
    /// fitted as closely as possible to the target's local +Z. Translation
    /// is unchanged.
    pub fn look_at(&mut self, target: &Pose) {
        let eye = self.pose.position();
        let forward = (target.position() - eye).normalize();
        if forward == Vec3::ZERO {
            return;
        }

        let candidates = [target.rotation_matrix().column(2), self.up(), Vec3::Z, Vec3::X];
        let up = candidates
            .iter()
            .map(|&u| u - forward * u.dot(forward))
            .find(|u| u.len() > 1e-6)
            .map(|u| u.normalize())
            .unwrap_or(Vec3::Y);

        let y_axis = -up;
        let x_axis = y_axis.cross(forward);
        let rot = Mat3::from_columns(x_axis, y_axis, forward);
        self.pose = Pose::from_matrix(&Mat4::from_rotation_translation(rot, eye));
    }

    fn relock(&mut self) {
        if let Some(target) = self.look_at {
            self.look_at(&target);
        }
    }

    fn translate_local(&mut self, dx: f64, dy: f64, dz: f64) {
        self.pose = self.pose * Pose::translation(dx, dy, dz);
        self.relock();
    }

    /// Move along the local X axis
    pub fn move_x(&mut self, step: f64) {
        self.translate_local(step, 0.0, 0.0);
    }

    /// Move along the local Y axis
    pub fn move_y(&mut self, step: f64) {
        self.translate_local(0.0, step, 0.0);
    }

    /// Move along the local Z axis (forward)
    pub fn move_z(&mut self, step: f64) {
        self.translate_local(0.0, 0.0, step);
    }

    /// Rotate about the local axes, in degrees
    pub fn rotate(&mut self, droll: f64, dpitch: f64, dyaw: f64) {
        self.pose = self.pose * Pose::rotation(droll, dpitch, dyaw);
    }
}

impl Object3D for Camera {
    fn name(&self) -> &str {
        &self.name
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn mesh(&self) -> Option<&Mesh> {
        self.rig.as_ref()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn shows_axes(&self) -> bool {
        self.show_axes
    }
}

/// Small pyramid marking a camera: apex at the eye, base toward +Z
fn rig_mesh(aspect: f64) -> Option<Mesh> {
    let (hw, hh, depth) = (0.05 * aspect, 0.05, 0.15);
    let vertices = vec![
        Vec3::ZERO,
        Vec3::new(-hw, -hh, depth),
        Vec3::new(hw, -hh, depth),
        Vec3::new(hw, hh, depth),
        Vec3::new(-hw, hh, depth),
    ];
    let faces = vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1], [1, 3, 2], [1, 4, 3]];
    Mesh::new(vertices, faces).ok()
}
