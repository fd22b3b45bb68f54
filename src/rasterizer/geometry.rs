//! Stateless numeric kernels used by the rasterizer

use super::math::{Vec2, Vec3};

/// Returned by `barycentric` when the triangle has no usable area
pub const DEGENERATE: Vec3 = Vec3 { x: -1.0, y: -1.0, z: -1.0 };

/// Barycentric coordinates of `p` in triangle (a, b, c), as weights for a, b, c.
///
/// The triangle is degenerate when its doubled signed area is below one
/// pixel; `DEGENERATE` is returned so callers skip the point.
pub fn barycentric(a: Vec2, b: Vec2, c: Vec2, p: Vec2) -> Vec3 {
    let xs = Vec3::new(b.x - a.x, c.x - a.x, a.x - p.x);
    let ys = Vec3::new(b.y - a.y, c.y - a.y, a.y - p.y);
    let n = xs.cross(ys);
    if n.z.abs() < 1.0 {
        return DEGENERATE;
    }
    Vec3::new(1.0 - (n.x + n.y) / n.z, n.x / n.z, n.y / n.z)
}

/// Inclusive integer pixel box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl PixelBox {
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }
}

/// Screen box of three projected points, clamped to `[0, width-1] x [0, height-1]`.
///
/// Only x and y are used. Returns None when the box misses the canvas or a
/// coordinate is not finite.
pub fn bounding_box(a: Vec3, b: Vec3, c: Vec3, width: usize, height: usize) -> Option<PixelBox> {
    if width == 0 || height == 0 || !(a.is_finite() && b.is_finite() && c.is_finite()) {
        return None;
    }
    let lo_x = a.x.min(b.x).min(c.x).floor();
    let lo_y = a.y.min(b.y).min(c.y).floor();
    let hi_x = a.x.max(b.x).max(c.x).ceil();
    let hi_y = a.y.max(b.y).max(c.y).ceil();

    let (w, h) = ((width - 1) as f64, (height - 1) as f64);
    if hi_x < 0.0 || hi_y < 0.0 || lo_x > w || lo_y > h {
        return None;
    }
    Some(PixelBox {
        min_x: lo_x.max(0.0) as usize,
        min_y: lo_y.max(0.0) as usize,
        max_x: hi_x.min(w) as usize,
        max_y: hi_y.min(h) as usize,
    })
}

/// Unit-length copy of `v`
pub fn normalize(v: Vec3) -> Vec3 {
    v.normalize()
}

/// Unit normal of a world-space triangle, `(c - a) x (b - a)`
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (c - a).cross(b - a).normalize()
}

/// Clip segment `a`-`b` to the box `[min, max]` (Liang-Barsky).
///
/// Returns None when the segment misses the box entirely.
pub fn clip_segment(a: Vec2, b: Vec2, min: Vec2, max: Vec2) -> Option<(Vec2, Vec2)> {
    if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
        return None;
    }
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (p, q) in [
        (-dx, a.x - min.x),
        (dx, max.x - a.x),
        (-dy, a.y - min.y),
        (dy, max.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        Vec2::new(a.x + t0 * dx, a.y + t0 * dy),
        Vec2::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}

/// Integer Bresenham walk between two pixels, endpoints included.
///
/// Steep lines are walked along Y. Points are always produced from the lower
/// to the higher major coordinate.
pub struct LinePoints {
    steep: bool,
    x: i64,
    x_end: i64,
    y: i64,
    dx: i64,
    y_step: i64,
    derror2: i64,
    error2: i64,
}

impl LinePoints {
    pub fn new(a: (i64, i64), b: (i64, i64)) -> Self {
        let (mut x0, mut y0, mut x1, mut y1) = (a.0, a.1, b.0, b.1);
        let steep = (x0 - x1).abs() < (y0 - y1).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }
        let dy = y1 - y0;
        Self {
            steep,
            x: x0,
            x_end: x1,
            y: y0,
            dx: x1 - x0,
            y_step: if dy > 0 { 1 } else { -1 },
            derror2: dy.abs() * 2,
            error2: 0,
        }
    }
}

impl Iterator for LinePoints {
    type Item = (i64, i64);

    fn next(&mut self) -> Option<(i64, i64)> {
        if self.x > self.x_end {
            return None;
        }
        let point = if self.steep { (self.y, self.x) } else { (self.x, self.y) };
        self.error2 += self.derror2;
        if self.error2 > self.dx {
            self.y += self.y_step;
            self.error2 -= self.dx * 2;
        }
        self.x += 1;
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Vec2, Vec2, Vec2) {
        (Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(5.0, 10.0))
    }

    #[test]
    fn test_barycentric_inside_sums_to_one() {
        let (a, b, c) = tri();
        for p in [Vec2::new(5.0, 3.0), Vec2::new(4.0, 1.0), Vec2::new(6.0, 7.0)] {
            let bc = barycentric(a, b, c, p);
            assert!(bc.x >= 0.0 && bc.y >= 0.0 && bc.z >= 0.0);
            assert!((bc.x + bc.y + bc.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_barycentric_at_vertices() {
        let (a, b, c) = tri();
        let expected = [(a, Vec3::X), (b, Vec3::Y), (c, Vec3::Z)];
        for (p, e) in expected {
            let bc = barycentric(a, b, c, p);
            assert!((bc - e).len() < 1e-12, "{:?} != {:?}", bc, e);
        }
    }

    #[test]
    fn test_barycentric_outside_has_negative() {
        let (a, b, c) = tri();
        let bc = barycentric(a, b, c, Vec2::new(-1.0, 5.0));
        assert!(bc.x < 0.0 || bc.y < 0.0 || bc.z < 0.0);
    }

    #[test]
    fn test_barycentric_degenerate() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(5.0, 5.0);
        let c = Vec2::new(10.0, 10.0);
        assert_eq!(barycentric(a, b, c, Vec2::new(5.0, 5.0)), DEGENERATE);
        // Doubled area of 0.5 is below one pixel
        let c = Vec2::new(1.0, 0.5);
        let b = Vec2::new(1.0, 0.0);
        assert_eq!(barycentric(a, b, c, a), DEGENERATE);
    }

    #[test]
    fn test_bounding_box_clamps() {
        let bb = bounding_box(
            Vec3::new(-5.0, 2.0, 1.0),
            Vec3::new(30.0, 4.0, 1.0),
            Vec3::new(3.0, 50.0, 1.0),
            20,
            20,
        )
        .unwrap();
        assert_eq!(bb, PixelBox { min_x: 0, min_y: 2, max_x: 19, max_y: 19 });
        assert_eq!(bb.area(), 20 * 18);
    }

    #[test]
    fn test_bounding_box_off_canvas() {
        let off = bounding_box(
            Vec3::new(-5.0, -5.0, 1.0),
            Vec3::new(-1.0, -2.0, 1.0),
            Vec3::new(-3.0, -9.0, 1.0),
            20,
            20,
        );
        assert!(off.is_none());
        let nan = bounding_box(Vec3::new(f64::NAN, 0.0, 1.0), Vec3::ZERO, Vec3::ZERO, 20, 20);
        assert!(nan.is_none());
    }

    #[test]
    fn test_line_points_diagonal() {
        let pts: Vec<_> = LinePoints::new((0, 0), (19, 19)).collect();
        assert_eq!(pts.len(), 20);
        assert!(pts.iter().enumerate().all(|(i, &(x, y))| x == i as i64 && y == i as i64));
    }

    #[test]
    fn test_line_points_vertical_and_reversed() {
        let pts: Vec<_> = LinePoints::new((10, 19), (10, 0)).collect();
        assert_eq!(pts.len(), 20);
        assert!(pts.iter().all(|&(x, _)| x == 10));
        let single: Vec<_> = LinePoints::new((3, 4), (3, 4)).collect();
        assert_eq!(single, vec![(3, 4)]);
    }

    #[test]
    fn test_face_normal() {
        let n = face_normal(Vec3::ZERO, Vec3::Y, Vec3::X);
        assert!((n - Vec3::Z).len() < 1e-12);
    }

    #[test]
    fn test_clip_segment() {
        let (min, max) = (Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let (a, b) = clip_segment(Vec2::new(-10.0, 5.0), Vec2::new(20.0, 5.0), min, max).unwrap();
        assert!((a.x - 0.0).abs() < 1e-9 && (b.x - 10.0).abs() < 1e-9);
        assert_eq!((a.y, b.y), (5.0, 5.0));
        let inside = clip_segment(Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0), min, max).unwrap();
        assert_eq!(inside, (Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0)));
        assert!(clip_segment(Vec2::new(-5.0, -5.0), Vec2::new(-1.0, 20.0), min, max).is_none());
    }
}
