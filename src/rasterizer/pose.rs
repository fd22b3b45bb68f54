//! Rigid transforms: translation plus intrinsic X->Y->Z Euler angles (degrees)

use std::ops::Mul;
use serde::{Deserialize, Serialize};

use super::math::{Mat3, Mat4, Vec3};

/// Component tolerance used by `Pose` equality
pub const POSE_EPSILON: f64 = 1e-7;

/// Position and orientation of an object in world space
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
}

impl Pose {
    pub const IDENTITY: Pose = Pose { x: 0.0, y: 0.0, z: 0.0, roll: 0.0, pitch: 0.0, yaw: 0.0 };

    pub fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { x, y, z, roll, pitch, yaw }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, ..Self::IDENTITY }
    }

    pub fn rotation(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw, ..Self::IDENTITY }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Rotation block `Rx(roll) * Ry(pitch) * Rz(yaw)`
    pub fn rotation_matrix(&self) -> Mat3 {
        Mat3::rot_x(self.roll) * Mat3::rot_y(self.pitch) * Mat3::rot_z(self.yaw)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation_matrix(), self.position())
    }

    /// Inverse of `to_matrix`. Pitch is returned in [-90, 90], roll and yaw
    /// in (-180, 180]. At gimbal lock the yaw is folded into the roll.
    pub fn from_matrix(m: &Mat4) -> Pose {
        let t = m.translation();
        let (roll, pitch, yaw) = euler_xyz(&m.rotation());
        Pose::new(t.x, t.y, t.z, roll, pitch, yaw)
    }

    /// Same as `a * b`: apply `b`, then `a`
    pub fn compose(a: &Pose, b: &Pose) -> Pose {
        Pose::from_matrix(&(a.to_matrix() * b.to_matrix()))
    }

    fn components(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }
}

fn euler_xyz(r: &Mat3) -> (f64, f64, f64) {
    let m = &r.0;
    let sin_pitch = m[0][2].clamp(-1.0, 1.0);
    let pitch = sin_pitch.asin();
    if sin_pitch.abs() < 1.0 - 1e-12 {
        let roll = (-m[1][2]).atan2(m[2][2]);
        let yaw = (-m[0][1]).atan2(m[0][0]);
        (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    } else {
        let roll = m[2][1].atan2(m[1][1]);
        (roll.to_degrees(), pitch.to_degrees(), 0.0)
    }
}

impl PartialEq for Pose {
    fn eq(&self, other: &Pose) -> bool {
        self.components()
            .iter()
            .zip(other.components().iter())
            .all(|(a, b)| (a - b).abs() < POSE_EPSILON)
    }
}

impl Mul for Pose {
    type Output = Pose;
    fn mul(self, rhs: Pose) -> Pose {
        Pose::compose(&self, &rhs)
    }
}

impl std::fmt::Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.3} | {:.2}, {:.2}, {:.2})",
            self.x, self.y, self.z, self.roll, self.pitch, self.yaw
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_pose(rng: &mut StdRng) -> Pose {
        Pose::new(
            rng.random_range(-50.0..50.0),
            rng.random_range(-50.0..50.0),
            rng.random_range(-50.0..50.0),
            rng.random_range(-179.0..179.0),
            rng.random_range(-85.0..85.0),
            rng.random_range(-179.0..179.0),
        )
    }

    #[test]
    fn test_identity_round_trip() {
        let p = Pose::IDENTITY;
        assert_eq!(Pose::from_matrix(&p.to_matrix()), p);
    }

    #[test]
    fn test_known_pose_round_trip() {
        let p = Pose::new(-4.0, 3.0, 4.0, 10.0, 20.0, 30.0);
        assert_eq!(Pose::from_matrix(&p.to_matrix()), p);
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = random_pose(&mut rng);
            let back = Pose::from_matrix(&p.to_matrix());
            assert_eq!(back, p, "round trip failed for {}", p);
        }
    }

    #[test]
    fn test_compose_with_identity() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let p = random_pose(&mut rng);
            assert_eq!(p * Pose::IDENTITY, p);
            assert_eq!(Pose::IDENTITY * p, p);
        }
    }

    #[test]
    fn test_compose_is_not_commutative() {
        let a = Pose::translation(1.0, 0.0, 0.0);
        let b = Pose::rotation(0.0, 0.0, 90.0);
        // b's rotation turns a's offset when b is applied last
        assert_eq!(a * b, Pose::new(1.0, 0.0, 0.0, 0.0, 0.0, 90.0));
        assert_eq!(b * a, Pose::new(0.0, 1.0, 0.0, 0.0, 0.0, 90.0));
    }

    #[test]
    fn test_equality_is_symmetric() {
        let a = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let b = Pose::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert_ne!(a, b);
        assert_ne!(b, a);
    }

    #[test]
    fn test_gimbal_lock_preserves_matrix() {
        let p = Pose::new(0.0, 0.0, 0.0, 30.0, 90.0, 15.0);
        let back = Pose::from_matrix(&p.to_matrix());
        let (m1, m2) = (p.to_matrix(), back.to_matrix());
        for r in 0..3 {
            for c in 0..3 {
                assert!((m1.0[r][c] - m2.0[r][c]).abs() < 1e-9);
            }
        }
    }
}
