//! Frame buffers and triangle rasterization
//!
//! Triangles are scan-converted one at a time over their clamped screen box.
//! Inside one triangle, rows are independent: each row of the color, depth and
//! instance buffers is handed to exactly one worker, so the depth test's
//! read-modify-write never races.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::camera::{Camera, Projection};
use super::geometry::{barycentric, bounding_box, clip_segment, face_normal, LinePoints, PixelBox};
use super::math::{Vec2, Vec3};
use super::mesh::{Mesh, Object3D};
use super::pose::Pose;
use super::types::{Color, Light, RenderMode, RenderSettings, Texture};

/// Unit axes in local space: origin, +X, +Y, +Z, -X, -Y, -Z
const AXES: [Vec3; 7] = [
    Vec3 { x: 0.0, y: 0.0, z: 0.0 },
    Vec3 { x: 1.0, y: 0.0, z: 0.0 },
    Vec3 { x: 0.0, y: 1.0, z: 0.0 },
    Vec3 { x: 0.0, y: 0.0, z: 1.0 },
    Vec3 { x: -1.0, y: 0.0, z: 0.0 },
    Vec3 { x: 0.0, y: -1.0, z: 0.0 },
    Vec3 { x: 0.0, y: 0.0, z: -1.0 },
];

const AXIS_COLORS: [Color; 6] = [
    Color::RED,
    Color::GREEN,
    Color::BLUE,
    Color::MAGENTA,
    Color::YELLOW,
    Color::CYAN,
];

/// Color, depth and instance-id buffers of one frame
pub struct Framebuffer {
    pub pixels: Vec<u8>,    // RGBA, 4 bytes per pixel
    pub depth: Vec<f32>,    // camera-space z, +inf where empty
    pub instances: Vec<u32>, // 0 = background, else 1-based object index
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            depth: vec![f32::INFINITY; width * height],
            instances: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        let bytes = color.to_bytes();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bytes);
        }
        self.depth.fill(f32::INFINITY);
        self.instances.fill(0);
    }

    /// Bounds-checked write; coordinates off the canvas are dropped
    pub fn set_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            let idx = (y as usize * self.width + x as usize) * 4;
            self.pixels[idx..idx + 4].copy_from_slice(&color.to_bytes());
        }
    }

    /// Color at (x, y), if on the canvas
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            let idx = (y * self.width + x) * 4;
            let p = &self.pixels[idx..idx + 4];
            Some(Color::with_alpha(p[0], p[1], p[2], p[3]))
        } else {
            None
        }
    }

    /// Depth-tested write; strictly closer wins
    fn set_pixel_with_depth(&mut self, x: i64, y: i64, z: f32, instance: u32, color: Color) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        let idx = y as usize * self.width + x as usize;
        if !(z < self.depth[idx]) {
            return false;
        }
        self.depth[idx] = z;
        self.instances[idx] = instance;
        self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
        true
    }
}

/// Where a triangle's base color comes from
#[derive(Debug, Clone, Copy)]
pub enum Paint<'a> {
    /// One color per vertex
    Colors([Color; 3]),
    /// Nearest-neighbour diffuse sample at the interpolated UV
    Texture { texture: &'a Texture, uvs: [Vec2; 3] },
}

impl<'a> Paint<'a> {
    pub fn uniform(color: Color) -> Self {
        Paint::Colors([color; 3])
    }

    fn at(&self, bc: Vec3) -> Color {
        match self {
            Paint::Colors(colors) => Color::interpolate(colors, &[bc.x, bc.y, bc.z], false),
            Paint::Texture { texture, uvs } => {
                let u = bc.x * uvs[0].x + bc.y * uvs[1].x + bc.z * uvs[2].x;
                let v = bc.x * uvs[0].y + bc.y * uvs[1].y + bc.z * uvs[2].y;
                texture.sample(u, v)
            }
        }
    }
}

/// Per-triangle lighting outcome, decided once before the pixel loop
#[derive(Debug, Clone, Copy, PartialEq)]
enum Shading {
    Unlit,
    Lit(f64),
    FacingAway,
}

impl Shading {
    fn new(light: Option<&Light>, normal: Option<Vec3>) -> Self {
        match (light, normal) {
            (Some(light), Some(normal)) => {
                let intensity = light.direction().dot(normal);
                if intensity > 0.0 {
                    Shading::Lit(intensity)
                } else {
                    Shading::FacingAway
                }
            }
            _ => Shading::Unlit,
        }
    }

    fn apply(self, paint: &Paint, bc: Vec3) -> Color {
        match self {
            Shading::Unlit => paint.at(bc),
            Shading::Lit(intensity) => paint.at(bc).shade(intensity),
            Shading::FacingAway => Color::UNLIT_MARKER,
        }
    }
}

/// Everything the row kernel needs about one triangle
struct TriangleSetup<'a> {
    a: Vec2,
    b: Vec2,
    c: Vec2,
    z: [f64; 3],
    paint: Paint<'a>,
    shading: Shading,
    instance: u32,
    bbox: PixelBox,
}

/// Rasterize row `y` of a triangle into that row's buffer slices
fn rasterize_row(t: &TriangleSetup, y: usize, colors: &mut [u8], depth: &mut [f32], instances: &mut [u32]) {
    for x in t.bbox.min_x..=t.bbox.max_x {
        let bc = barycentric(t.a, t.b, t.c, Vec2::new(x as f64, y as f64));
        if bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0 {
            continue;
        }
        let z = (bc.x * t.z[0] + bc.y * t.z[1] + bc.z * t.z[2]) as f32;
        if !(z < depth[x]) {
            continue;
        }
        depth[x] = z;
        instances[x] = t.instance;
        let color = t.shading.apply(&t.paint, bc);
        colors[x * 4..x * 4 + 4].copy_from_slice(&color.to_bytes());
    }
}

/// Frame lifecycle: Idle -> Accumulating -> Complete, back to Idle on clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Accumulating,
    Complete,
}

/// Software rasterizer owning one set of frame buffers
pub struct Renderer {
    fb: Framebuffer,
    settings: RenderSettings,
    state: FrameState,
}

impl Renderer {
    pub fn new(width: usize, height: usize, settings: RenderSettings) -> Self {
        let mut renderer = Self {
            fb: Framebuffer::new(width, height),
            settings,
            state: FrameState::Idle,
        };
        renderer.clear();
        renderer
    }

    /// Reallocate the buffers for a new resolution
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.fb.width, self.fb.height) {
            debug!("Resizing frame buffers to {}x{}", width, height);
            self.fb = Framebuffer::new(width, height);
        }
        self.clear();
    }

    /// Background color, depth +inf, instance 0
    pub fn clear(&mut self) {
        self.fb.clear(self.settings.background);
        self.state = FrameState::Idle;
    }

    pub fn width(&self) -> usize {
        self.fb.width
    }

    pub fn height(&self) -> usize {
        self.fb.height
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    pub fn mode(&self) -> RenderMode {
        self.settings.mode
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.settings.mode = mode;
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// RGBA bytes, row-major, `height * width * 4`
    pub fn color(&self) -> &[u8] {
        &self.fb.pixels
    }

    /// Camera-space depth, `height * width`
    pub fn depth(&self) -> &[f32] {
        &self.fb.depth
    }

    /// Instance ids, `height * width`
    pub fn instances(&self) -> &[u32] {
        &self.fb.instances
    }

    fn touch(&mut self) {
        if self.state == FrameState::Complete {
            warn!("Drawing into a completed frame without clearing it first");
        }
        self.state = FrameState::Accumulating;
    }

    /// Single pixel with RGB scaled by `intensity`
    pub fn draw_point(&mut self, x: i64, y: i64, color: Color, intensity: f64) {
        self.touch();
        let color = if intensity == 1.0 { color } else { color.shade(intensity) };
        self.fb.set_pixel(x, y, color);
    }

    /// Bresenham line between two pixels, no depth test
    pub fn draw_line(&mut self, a: (i64, i64), b: (i64, i64), color: Color) {
        self.touch();
        for (x, y) in LinePoints::new(a, b) {
            self.fb.set_pixel(x, y, color);
        }
    }

    /// Line between projected points, clipped to the canvas first so far-off
    /// endpoints do not make the walk huge
    fn draw_screen_line(&mut self, a: Vec3, b: Vec3, color: Color) {
        let min = Vec2::new(-1.0, -1.0);
        let max = Vec2::new(self.fb.width as f64, self.fb.height as f64);
        if let Some((p, q)) = clip_segment(Vec2::new(a.x, a.y), Vec2::new(b.x, b.y), min, max) {
            let p = (p.x.round() as i64, p.y.round() as i64);
            let q = (q.x.round() as i64, q.y.round() as i64);
            self.draw_line(p, q, color);
        }
    }

    /// Fill a screen-space triangle with depth testing.
    ///
    /// `a`, `b`, `c` carry pixel x, y and camera-space z; x and y are rounded
    /// to whole pixels. When two vertices land on the same pixel the triangle
    /// is drawn as a depth-tested line in the first vertex color. `normal`
    /// together with `light` enables Lambert shading.
    pub fn draw_triangle(
        &mut self,
        a: Vec3,
        b: Vec3,
        c: Vec3,
        paint: Paint,
        normal: Option<Vec3>,
        light: Option<&Light>,
        instance: u32,
    ) {
        self.touch();
        let snap = |v: Vec3| Vec3::new(v.x.round(), v.y.round(), v.z);
        let (a, b, c) = (snap(a), snap(b), snap(c));
        let shading = Shading::new(light, normal);

        let same = |p: Vec3, q: Vec3| p.x == q.x && p.y == q.y;
        let line = if same(a, b) || same(a, c) {
            Some((a, if same(a, b) { c } else { b }))
        } else if same(b, c) {
            Some((a, b))
        } else {
            None
        };
        if let Some((p, q)) = line {
            let color = shading.apply(&paint, Vec3::X);
            self.draw_depth_line(p, q, color, instance);
            return;
        }

        let Some(bbox) = bounding_box(a, b, c, self.fb.width, self.fb.height) else {
            return;
        };
        let setup = TriangleSetup {
            a: Vec2::new(a.x, a.y),
            b: Vec2::new(b.x, b.y),
            c: Vec2::new(c.x, c.y),
            z: [a.z, b.z, c.z],
            paint,
            shading,
            instance,
            bbox,
        };

        let w = self.fb.width;
        let rows = bbox.min_y..bbox.max_y + 1;
        let colors = &mut self.fb.pixels[rows.start * w * 4..rows.end * w * 4];
        let depth = &mut self.fb.depth[rows.start * w..rows.end * w];
        let instances = &mut self.fb.instances[rows.start * w..rows.end * w];

        if self.settings.parallel && bbox.area() >= self.settings.parallel_threshold {
            colors
                .par_chunks_mut(w * 4)
                .zip(depth.par_chunks_mut(w))
                .zip(instances.par_chunks_mut(w))
                .enumerate()
                .for_each(|(i, ((c, d), n))| rasterize_row(&setup, rows.start + i, c, d, n));
        } else {
            colors
                .chunks_mut(w * 4)
                .zip(depth.chunks_mut(w))
                .zip(instances.chunks_mut(w))
                .enumerate()
                .for_each(|(i, ((c, d), n))| rasterize_row(&setup, rows.start + i, c, d, n));
        }
    }

    /// Bresenham line with depth interpolated between the endpoints.
    ///
    /// The segment is clipped to the canvas before walking; depth is still
    /// parameterized along the unclipped segment.
    fn draw_depth_line(&mut self, p: Vec3, q: Vec3, color: Color, instance: u32) {
        if !(p.is_finite() && q.is_finite()) {
            return;
        }
        let min = Vec2::new(-1.0, -1.0);
        let max = Vec2::new(self.fb.width as f64, self.fb.height as f64);
        let Some((a, b)) = clip_segment(Vec2::new(p.x, p.y), Vec2::new(q.x, q.y), min, max) else {
            return;
        };
        let steps = (q.x - p.x).abs().max((q.y - p.y).abs());
        let a = (a.x.round() as i64, a.y.round() as i64);
        let b = (b.x.round() as i64, b.y.round() as i64);
        for (x, y) in LinePoints::new(a, b) {
            let t = if steps == 0.0 {
                0.0
            } else {
                ((x as f64 - p.x).abs().max((y as f64 - p.y).abs()) / steps).min(1.0)
            };
            let z = (p.z + t * (q.z - p.z)) as f32;
            self.fb.set_pixel_with_depth(x, y, z, instance, color);
        }
    }

    /// Draw every visible object through `camera`, then the overlays.
    ///
    /// Instance ids are 1-based positions in `objects`. Lit modes fall back
    /// to unlit drawing when `light` is None. Returns the color buffer.
    pub fn draw(&mut self, objects: &[&dyn Object3D], camera: &Camera, light: Option<&Light>) -> &[u8] {
        self.touch();
        let mode = self.settings.mode;
        let light = if mode.is_lit() {
            if light.is_none() {
                warn!("Render mode '{}' has no light, drawing unlit", mode.label());
            }
            light
        } else {
            None
        };
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        debug!("Drawing {} objects in '{}' mode", objects.len(), mode.label());

        for (i, object) in objects.iter().enumerate() {
            if !object.is_visible() {
                continue;
            }
            let Some(mesh) = object.mesh() else {
                continue;
            };
            let world = object.world_vertices();
            let projection = camera.project(&world);
            let instance = (i + 1) as u32;

            match mode {
                RenderMode::Wireframe => self.draw_wireframe(&projection, mesh, Color::WHITE),
                RenderMode::FacesNoLightRandomColors => {
                    self.draw_faces_random_colors(&projection, mesh, instance, &mut rng)
                }
                RenderMode::FacesNoMat => self.draw_faces_lit(&world, &projection, mesh, instance, light, false),
                RenderMode::Faces => self.draw_faces_lit(&world, &projection, mesh, instance, light, true),
            }

            if self.settings.show_object_axes && object.shows_axes() {
                self.draw_object_axes(&object.pose(), camera);
            }
        }

        if self.settings.show_world_axes {
            self.draw_world_axes(camera);
        }
        self.state = FrameState::Complete;
        &self.fb.pixels
    }

    /// Triangle corners, or None if any of them was culled
    fn face_points(projection: &Projection, face: &[usize; 3]) -> Option<[Vec3; 3]> {
        if face.iter().any(|&i| projection.is_outlier(i)) {
            return None;
        }
        Some([projection.points[face[0]], projection.points[face[1]], projection.points[face[2]]])
    }

    /// Triangle edges only; edges touching a culled vertex are skipped
    pub fn draw_wireframe(&mut self, projection: &Projection, mesh: &Mesh, color: Color) {
        for face in mesh.faces() {
            for k in 0..3 {
                let (i, j) = (face[k], face[(k + 1) % 3]);
                if projection.is_outlier(i) || projection.is_outlier(j) {
                    continue;
                }
                self.draw_screen_line(projection.points[i], projection.points[j], color);
            }
        }
    }

    /// Filled faces, one random color each, no lighting
    pub fn draw_faces_random_colors(&mut self, projection: &Projection, mesh: &Mesh, instance: u32, rng: &mut StdRng) {
        for face in mesh.faces() {
            // Drawn even when culled so the color sequence does not depend on the view
            let color = Color::random(rng);
            if let Some([a, b, c]) = Self::face_points(projection, face) {
                self.draw_triangle(a, b, c, Paint::uniform(color), None, None, instance);
            }
        }
    }

    /// Filled, Lambert-lit faces; textured when `textured` and the mesh has a texture
    pub fn draw_faces_lit(
        &mut self,
        world: &[Vec3],
        projection: &Projection,
        mesh: &Mesh,
        instance: u32,
        light: Option<&Light>,
        textured: bool,
    ) {
        let texture = if textured { mesh.texture() } else { None };
        for (fi, face) in mesh.faces().iter().enumerate() {
            let Some([a, b, c]) = Self::face_points(projection, face) else {
                continue;
            };
            let normal = face_normal(world[face[0]], world[face[1]], world[face[2]]);
            let normal = if normal == Vec3::ZERO { None } else { Some(normal) };
            let paint = match (texture, mesh.face_uvs(fi)) {
                (Some(texture), Some(uvs)) => Paint::Texture { texture, uvs },
                _ => Paint::uniform(Color::WHITE),
            };
            self.draw_triangle(a, b, c, paint, normal, light, instance);
        }
    }

    /// Origin and +X/+Y/+Z of an object's frame
    pub fn draw_object_axes(&mut self, pose: &Pose, camera: &Camera) {
        let m = pose.to_matrix();
        let len = self.settings.object_axis_length;
        let points: Vec<Vec3> = AXES[..4].iter().map(|&v| m.transform_point(v * len)).collect();
        self.draw_axes(&points, camera);
    }

    /// World origin with all six half-axes
    pub fn draw_world_axes(&mut self, camera: &Camera) {
        self.draw_axes(&AXES, camera);
    }

    fn draw_axes(&mut self, points: &[Vec3], camera: &Camera) {
        let projection = camera.project(points);
        if projection.is_outlier(0) {
            return;
        }
        for (k, color) in AXIS_COLORS.iter().enumerate().take(points.len() - 1) {
            if projection.is_outlier(k + 1) {
                continue;
            }
            self.draw_screen_line(projection.points[0], projection.points[k + 1], *color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::camera::CameraConfig;

    fn renderer(w: usize, h: usize) -> Renderer {
        Renderer::new(w, h, RenderSettings::default())
    }

    fn painted(r: &Renderer) -> Vec<(usize, usize, Color)> {
        let fb = r.framebuffer();
        let mut out = Vec::new();
        for y in 0..fb.height {
            for x in 0..fb.width {
                let c = fb.get_pixel(x, y).unwrap();
                if c != Color::BLACK {
                    out.push((x, y, c));
                }
            }
        }
        out
    }

    #[test]
    fn test_draw_point() {
        let mut r = renderer(20, 20);
        r.draw_point(10, 10, Color::WHITE, 1.0);
        assert_eq!(painted(&r), vec![(10, 10, Color::WHITE)]);
        r.draw_point(-1, 3, Color::RED, 1.0);
        r.draw_point(20, 3, Color::RED, 1.0);
        r.draw_point(3, 20, Color::RED, 1.0);
        assert_eq!(painted(&r).len(), 1);
        r.draw_point(0, 0, Color::with_alpha(200, 100, 50, 255), 0.5);
        assert_eq!(r.framebuffer().get_pixel(0, 0), Some(Color::new(100, 50, 25)));
    }

    #[test]
    fn test_draw_line_diagonal() {
        let mut r = renderer(20, 20);
        r.draw_line((0, 0), (19, 19), Color::RED);
        let px = painted(&r);
        assert_eq!(px.len(), 20);
        assert!(px.iter().all(|&(x, y, c)| x == y && c == Color::RED));
    }

    #[test]
    fn test_draw_line_vertical() {
        let mut r = renderer(20, 20);
        r.draw_line((10, 0), (10, 19), Color::WHITE);
        let px = painted(&r);
        assert_eq!(px.len(), 20);
        for y in 0..20 {
            assert!(px.contains(&(10, y, Color::WHITE)));
        }
    }

    #[test]
    fn test_draw_line_horizontal_and_steep() {
        let mut r = renderer(20, 20);
        r.draw_line((19, 5), (0, 5), Color::GREEN);
        assert_eq!(painted(&r).len(), 20);
        assert!(painted(&r).iter().all(|&(_, y, _)| y == 5));

        let mut r = renderer(20, 20);
        r.draw_line((19, 0), (0, 10), Color::RED);
        let px = painted(&r);
        assert_eq!(px.len(), 20);
        // One pixel per column
        for x in 0..20 {
            assert_eq!(px.iter().filter(|p| p.0 == x).count(), 1);
        }
    }

    #[test]
    fn test_draw_line_off_canvas_is_clipped() {
        let mut r = renderer(20, 20);
        r.draw_line((-10, 5), (30, 5), Color::RED);
        assert_eq!(painted(&r).len(), 20);
    }

    #[test]
    fn test_degenerate_triangle_matches_line() {
        let mut tri = renderer(40, 40);
        tri.draw_triangle(
            Vec3::new(20.0, 20.0, 1.0),
            Vec3::new(20.0, 20.0, 1.0),
            Vec3::new(30.0, 32.0, 1.0),
            Paint::uniform(Color::MAGENTA),
            None,
            None,
            1,
        );
        let mut line = renderer(40, 40);
        line.draw_line((20, 20), (30, 32), Color::MAGENTA);
        assert!(!painted(&line).is_empty());
        assert_eq!(tri.color(), line.color());
    }

    #[test]
    fn test_degenerate_triangle_with_far_vertex_is_clipped() {
        let mut r = renderer(64, 48);
        r.draw_triangle(
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(1e12, 10.0, 1.0),
            Paint::uniform(Color::WHITE),
            None,
            None,
            1,
        );
        let px = painted(&r);
        assert_eq!(px.len(), 54);
        assert!(px.iter().all(|&(x, y, _)| y == 10 && x >= 10));

        // Non-finite endpoints draw nothing
        let mut r = renderer(64, 48);
        r.draw_triangle(
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(f64::INFINITY, f64::NAN, 1.0),
            Paint::uniform(Color::WHITE),
            None,
            None,
            1,
        );
        assert!(painted(&r).is_empty());
    }

    #[test]
    fn test_degenerate_line_depth_follows_unclipped_segment() {
        let mut r = renderer(64, 48);
        r.draw_triangle(
            Vec3::new(0.0, 5.0, 1.0),
            Vec3::new(0.0, 5.0, 1.0),
            Vec3::new(200.0, 5.0, 3.0),
            Paint::uniform(Color::WHITE),
            None,
            None,
            1,
        );
        // x = 50 is a quarter of the way along
        assert!((r.depth()[5 * 64 + 50] - 1.5).abs() < 1e-6);
        assert!((r.depth()[5 * 64] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_collinear_triangle_draws_nothing() {
        let mut r = renderer(40, 40);
        r.draw_triangle(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(20.0, 20.0, 1.0),
            Paint::uniform(Color::WHITE),
            None,
            None,
            1,
        );
        assert!(painted(&r).is_empty());
    }

    fn square_tri(r: &mut Renderer, z: f64, color: Color, instance: u32) {
        r.draw_triangle(
            Vec3::new(2.0, 2.0, z),
            Vec3::new(30.0, 4.0, z),
            Vec3::new(10.0, 30.0, z),
            Paint::uniform(color),
            None,
            None,
            instance,
        );
    }

    fn other_tri(r: &mut Renderer, z: f64, color: Color, instance: u32) {
        r.draw_triangle(
            Vec3::new(30.0, 30.0, z),
            Vec3::new(3.0, 20.0, z),
            Vec3::new(25.0, 1.0, z),
            Paint::uniform(color),
            None,
            None,
            instance,
        );
    }

    #[test]
    fn test_depth_test_either_order() {
        for near_first in [true, false] {
            let mut r = renderer(32, 32);
            if near_first {
                square_tri(&mut r, 1.0, Color::RED, 1);
                other_tri(&mut r, 2.0, Color::BLUE, 2);
            } else {
                other_tri(&mut r, 2.0, Color::BLUE, 2);
                square_tri(&mut r, 1.0, Color::RED, 1);
            }
            // Pixel covered by both
            let idx = 15 * 32 + 15;
            assert_eq!(r.depth()[idx], 1.0);
            assert_eq!(r.instances()[idx], 1);
            assert_eq!(r.framebuffer().get_pixel(15, 15), Some(Color::RED));
        }
    }

    #[test]
    fn test_depth_tie_keeps_first() {
        let mut r = renderer(32, 32);
        square_tri(&mut r, 1.0, Color::RED, 1);
        other_tri(&mut r, 1.0, Color::BLUE, 2);
        assert_eq!(r.instances()[15 * 32 + 15], 1);
        assert_eq!(r.framebuffer().get_pixel(15, 15), Some(Color::RED));
    }

    #[test]
    fn test_vertex_colors_interpolated() {
        let mut r = renderer(64, 64);
        r.draw_triangle(
            Vec3::new(10.0, 10.0, 1.0),
            Vec3::new(50.0, 10.0, 1.0),
            Vec3::new(10.0, 50.0, 1.0),
            Paint::Colors([Color::RED, Color::GREEN, Color::BLUE]),
            None,
            None,
            1,
        );
        let fb = r.framebuffer();
        assert_eq!(fb.get_pixel(10, 10), Some(Color::RED));
        assert_eq!(fb.get_pixel(50, 10), Some(Color::GREEN));
        assert_eq!(fb.get_pixel(10, 50), Some(Color::BLUE));
        assert_eq!(fb.get_pixel(60, 60), Some(Color::BLACK));
        assert_eq!(r.depth()[60 * 64 + 60], f32::INFINITY);
    }

    #[test]
    fn test_lighting() {
        let light = Light::new("sun", Pose::IDENTITY, Vec3::new(0.0, 0.0, -2.0), Color::WHITE).unwrap();
        let tri = |r: &mut Renderer, normal: Option<Vec3>, light: Option<&Light>| {
            r.draw_triangle(
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(15.0, 0.0, 1.0),
                Vec3::new(0.0, 15.0, 1.0),
                Paint::uniform(Color::new(200, 100, 50)),
                normal,
                light,
                1,
            )
        };

        let mut r = renderer(16, 16);
        tri(&mut r, Some(Vec3::new(0.0, 0.0, -1.0)), Some(&light));
        assert_eq!(r.framebuffer().get_pixel(2, 2), Some(Color::new(200, 100, 50)));

        let mut r = renderer(16, 16);
        tri(&mut r, Some(Vec3::new(0.0, 0.0, 1.0)), Some(&light));
        assert_eq!(r.framebuffer().get_pixel(2, 2), Some(Color::UNLIT_MARKER));

        let mut r = renderer(16, 16);
        tri(&mut r, Some(Vec3::new(0.0, 0.0, 1.0)), None);
        assert_eq!(r.framebuffer().get_pixel(2, 2), Some(Color::new(200, 100, 50)));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let draw = |parallel: bool| {
            let settings = RenderSettings { parallel, parallel_threshold: 0, ..Default::default() };
            let mut r = Renderer::new(120, 90, settings);
            r.draw_triangle(
                Vec3::new(-20.0, 5.0, 3.0),
                Vec3::new(110.0, 40.0, 1.0),
                Vec3::new(30.0, 100.0, 2.0),
                Paint::Colors([Color::RED, Color::GREEN, Color::BLUE]),
                None,
                None,
                4,
            );
            (r.color().to_vec(), r.depth().to_vec(), r.instances().to_vec())
        };
        assert_eq!(draw(true), draw(false));
    }

    struct Quad {
        pose: Pose,
        mesh: Mesh,
        visible: bool,
    }

    impl Object3D for Quad {
        fn name(&self) -> &str {
            "quad"
        }
        fn pose(&self) -> Pose {
            self.pose
        }
        fn mesh(&self) -> Option<&Mesh> {
            Some(&self.mesh)
        }
        fn is_visible(&self) -> bool {
            self.visible
        }
    }

    fn quad_at(z: f64) -> Quad {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        Quad {
            pose: Pose::translation(0.0, 0.0, z),
            mesh: Mesh::new(vertices, vec![[0, 1, 2], [0, 2, 3]]).unwrap(),
            visible: true,
        }
    }

    fn test_camera() -> Camera {
        Camera::new(CameraConfig {
            name: "cam".to_string(),
            pose: Pose::IDENTITY,
            resolution: (64, 48),
            near: 0.1,
            far: 10.0,
            ..Default::default()
        })
        .unwrap()
    }

    fn scene_renderer(mode: RenderMode) -> Renderer {
        let settings = RenderSettings {
            mode,
            show_world_axes: false,
            show_object_axes: false,
            ..Default::default()
        };
        Renderer::new(64, 48, settings)
    }

    #[test]
    fn test_draw_objects_fills_buffers() {
        let cam = test_camera();
        let far = quad_at(5.0);
        let near = quad_at(3.0);
        let mut r = scene_renderer(RenderMode::FacesNoMat);
        let light = Light::new("l", Pose::IDENTITY, Vec3::new(0.0, 0.0, -1.0), Color::WHITE).unwrap();
        r.draw(&[&far, &near], &cam, Some(&light));

        assert_eq!(r.state(), FrameState::Complete);
        let center = 24 * 64 + 32;
        assert_eq!(r.instances()[center], 2);
        assert!((r.depth()[center] - 3.0).abs() < 1e-5);
        assert_eq!(r.instances()[0], 0);
        assert_eq!(r.depth()[0], f32::INFINITY);

        r.clear();
        assert_eq!(r.state(), FrameState::Idle);
        assert!(r.instances().iter().all(|&i| i == 0));
        assert!(r.depth().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_lit_mode_without_light_draws_unlit() {
        let cam = test_camera();
        let quad = quad_at(3.0);
        let center = (32, 24);

        // A light behind the quad marks it as facing away
        let behind = Light::new("l", Pose::IDENTITY, Vec3::new(0.0, 0.0, 1.0), Color::WHITE).unwrap();
        let mut r = scene_renderer(RenderMode::FacesNoMat);
        r.draw(&[&quad], &cam, Some(&behind));
        assert_eq!(r.framebuffer().get_pixel(center.0, center.1), Some(Color::UNLIT_MARKER));

        let mut r = scene_renderer(RenderMode::FacesNoMat);
        r.draw(&[&quad], &cam, None);
        assert_eq!(r.framebuffer().get_pixel(center.0, center.1), Some(Color::WHITE));
        assert_eq!(r.instances()[center.1 * 64 + center.0], 1);
        assert_eq!(r.state(), FrameState::Complete);
    }

    #[test]
    fn test_hidden_and_culled_objects_skipped() {
        let cam = test_camera();
        let mut hidden = quad_at(3.0);
        hidden.visible = false;
        let behind = quad_at(-3.0);
        let beyond = quad_at(50.0);
        let mut r = scene_renderer(RenderMode::Faces);
        r.draw(&[&hidden, &behind, &beyond], &cam, None);
        assert!(r.instances().iter().all(|&i| i == 0));
        assert!(painted(&r).is_empty());
    }

    #[test]
    fn test_wireframe_draws_edges_only() {
        let cam = test_camera();
        let quad = quad_at(3.0);
        let mut r = scene_renderer(RenderMode::Wireframe);
        r.draw(&[&quad], &cam, None);
        let px = painted(&r);
        assert!(!px.is_empty());
        assert!(px.iter().all(|&(_, _, c)| c == Color::WHITE));
        assert!(r.instances().iter().all(|&i| i == 0));
    }

    #[test]
    fn test_random_colors_are_reproducible() {
        let cam = test_camera();
        let quad = quad_at(3.0);
        let mut a = scene_renderer(RenderMode::FacesNoLightRandomColors);
        let mut b = scene_renderer(RenderMode::FacesNoLightRandomColors);
        let first = a.draw(&[&quad], &cam, None).to_vec();
        assert_eq!(first, b.draw(&[&quad], &cam, None).to_vec());
        a.clear();
        assert_eq!(first, a.draw(&[&quad], &cam, None).to_vec());
    }

    #[test]
    fn test_world_axes_drawn() {
        let mut cam = test_camera();
        cam.set_pose(Pose::translation(0.5, 0.5, -4.0));
        let settings = RenderSettings { show_world_axes: true, ..Default::default() };
        let mut r = Renderer::new(64, 48, settings);
        r.draw(&[], &cam, None);
        let px = painted(&r);
        assert!(px.iter().any(|p| p.2 == Color::RED));
        assert!(px.iter().any(|p| p.2 == Color::GREEN));
    }

    #[test]
    fn test_resize() {
        let mut r = renderer(10, 10);
        r.resize(30, 20);
        assert_eq!((r.width(), r.height()), (30, 20));
        assert_eq!(r.color().len(), 30 * 20 * 4);
        assert_eq!(r.depth().len(), 30 * 20);
        assert_eq!(r.instances().len(), 30 * 20);
    }
}
