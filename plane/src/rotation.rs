use crate::geometry::Point;
use nalgebra::Matrix3;
use plane_traits::Orientation;

/// Right-handed rotation about x (roll).
pub fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// Right-handed rotation about y (pitch).
pub fn rot_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// Right-handed rotation about z (yaw).
pub fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Yaw, then pitch, then roll, applied to row vectors:
/// `v' = v · R_yaw · R_pitch · R_roll`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    matrix: Matrix3<f64>,
}

impl Rotation {
    pub fn identity() -> Self {
        Rotation {
            matrix: Matrix3::identity(),
        }
    }

    /// Angles are in degrees.
    pub fn from_orientation(orientation: &Orientation) -> Self {
        let yaw = rot_z(orientation.yaw.to_radians());
        let pitch = rot_y(orientation.pitch.to_radians());
        let roll = rot_x(orientation.roll.to_radians());
        Rotation {
            matrix: yaw * pitch * roll,
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn apply(&self, point: &Point) -> Point {
        (point.transpose() * self.matrix).transpose()
    }

    pub fn apply_all(&self, points: &[Point]) -> Vec<Point> {
        points.iter().map(|p| self.apply(p)).collect()
    }
}
