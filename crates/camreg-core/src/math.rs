//! Scalar and geometry aliases and the rotation-vector (axis-angle)
//! exponential/log maps.

use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
/// Board and camera-frame points, meters.
pub type Pt3 = Point3<Real>;
pub type Mat3 = Matrix3<Real>;

/// Exponential map: rotation vector (axis * angle) to a 3×3 rotation matrix.
pub fn rotation_from_vector(rvec: &Vec3) -> Mat3 {
    Rotation3::new(*rvec).into_inner()
}

/// Log map: 3×3 rotation matrix to its rotation vector.
///
/// The input is re-orthonormalised first, so matrices carrying a little
/// numerical drift are accepted.
pub fn vector_from_rotation(rmat: &Mat3) -> Vec3 {
    Rotation3::from_matrix(rmat).scaled_axis()
}

/// Geodesic angle (radians) between two rotation matrices.
pub fn rotation_angle_between(a: &Mat3, b: &Mat3) -> Real {
    let r_diff = a.transpose() * b;
    ((r_diff.trace() - 1.0) * 0.5).clamp(-1.0, 1.0).acos()
}

/// Angle (radians) between two rays.
///
/// The normalised dot product is clamped into `[-1, 1]` before `acos` so
/// round-off never leaves the domain. Degenerate (zero-length) rays yield 0.
pub fn angle_between_rays(a: &Vec3, b: &Vec3) -> Real {
    let denom = a.norm() * b.norm();
    if denom <= Real::EPSILON {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}
