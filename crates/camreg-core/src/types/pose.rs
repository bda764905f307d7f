//! Board poses and camera-to-camera rigid transforms.

use serde::{Deserialize, Serialize};

use crate::{rotation_from_vector, vector_from_rotation, Mat3, Pt3, Real, Vec3};

/// Board-to-camera pose: rotation vector (axis-angle) plus translation.
///
/// Maps points from the board's local frame into the camera frame:
/// `p_c = R(rotation) * p_b + translation`. Translation is expressed in the
/// board's length unit (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Vec3,
    pub translation: Vec3,
}

impl Pose {
    pub fn new(rotation: Vec3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Pose whose six components all equal `value`.
    ///
    /// Used as a non-degenerate seed for iterative PnP.
    pub fn splat(value: Real) -> Self {
        Self::new(Vec3::repeat(value), Vec3::repeat(value))
    }

    /// Build from a rotation matrix and translation.
    pub fn from_parts(rotation: &Mat3, translation: Vec3) -> Self {
        Self::new(vector_from_rotation(rotation), translation)
    }

    /// Rotation matrix via the exponential map.
    pub fn rotation_matrix(&self) -> Mat3 {
        rotation_from_vector(&self.rotation)
    }

    /// Map a board-frame point into the camera frame.
    pub fn transform_point(&self, p_board: &Pt3) -> Pt3 {
        Pt3::from(self.rotation_matrix() * p_board.coords + self.translation)
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.iter().chain(self.translation.iter()).all(|v| v.is_finite())
    }
}

/// Rigid transform between two camera frames.
///
/// `RigidTransform` values produced by [`RigidTransform::from_board_poses`]
/// map camera-B coordinates into camera-A coordinates:
/// `p_a = rotation * p_b + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: Mat3,
    pub translation: Vec3,
}

impl RigidTransform {
    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Mat3::identity(), Vec3::zeros())
    }

    /// Transform from camera B to camera A given both board poses
    /// of a single observation instant.
    ///
    /// `R = R_a R_bᵀ`, `t = t_a − R t_b`.
    pub fn from_board_poses(pose_a: &Pose, pose_b: &Pose) -> Self {
        let r_a = pose_a.rotation_matrix();
        let r_b = pose_b.rotation_matrix();
        let rotation = r_a * r_b.transpose();
        let translation = -(rotation * pose_b.translation) + pose_a.translation;
        Self::new(rotation, translation)
    }

    /// Algebraic inverse: `Rᵀ`, `−Rᵀ t`.
    pub fn inverse(&self) -> Self {
        let r_t = self.rotation.transpose();
        Self::new(r_t, -(r_t * self.translation))
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &RigidTransform) -> Self {
        Self::new(
            self.rotation * other.rotation,
            self.rotation * other.translation + self.translation,
        )
    }

    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        Pt3::from(self.rotation * p.coords + self.translation)
    }

    /// True when the rotation is orthonormal with determinant ≈ +1.
    pub fn is_rigid(&self, tol: Real) -> bool {
        let ortho = (self.rotation.transpose() * self.rotation - Mat3::identity()).norm();
        ortho <= tol && (self.rotation.determinant() - 1.0).abs() <= tol
    }

    pub fn is_finite(&self) -> bool {
        self.rotation
            .iter()
            .chain(self.translation.iter())
            .all(|v| v.is_finite())
    }

    /// Rotation as 9 values in row-major order.
    pub fn rotation_row_major(&self) -> [Real; 9] {
        let r = &self.rotation;
        [
            r[(0, 0)],
            r[(0, 1)],
            r[(0, 2)],
            r[(1, 0)],
            r[(1, 1)],
            r[(1, 2)],
            r[(2, 0)],
            r[(2, 1)],
            r[(2, 2)],
        ]
    }

    pub fn translation_array(&self) -> [Real; 3] {
        [self.translation.x, self.translation.y, self.translation.z]
    }

    pub fn approx_eq(&self, other: &RigidTransform, tol: Real) -> bool {
        (self.rotation - other.rotation).norm() <= tol
            && (self.translation - other.translation).norm() <= tol
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_a() -> Pose {
        Pose::new(Vec3::new(0.12, -0.3, 0.05), Vec3::new(0.04, -0.02, 0.8))
    }

    fn pose_b() -> Pose {
        Pose::new(Vec3::new(-0.25, 0.4, -0.1), Vec3::new(-0.15, 0.03, 0.95))
    }

    #[test]
    fn inverse_of_composition_matches_swapped_composition() {
        let b_to_a = RigidTransform::from_board_poses(&pose_a(), &pose_b());
        let a_to_b = RigidTransform::from_board_poses(&pose_b(), &pose_a());
        assert!(b_to_a.inverse().approx_eq(&a_to_b, 1e-12));
    }

    #[test]
    fn identical_poses_yield_identity() {
        let t = RigidTransform::from_board_poses(&pose_a(), &pose_a());
        assert!(t.approx_eq(&RigidTransform::identity(), 1e-12));
    }

    #[test]
    fn transform_times_inverse_is_identity() {
        let t = RigidTransform::from_board_poses(&pose_a(), &pose_b());
        assert!(t.is_rigid(1e-12));
        assert!(t
            .compose(&t.inverse())
            .approx_eq(&RigidTransform::identity(), 1e-12));
        assert!(t
            .inverse()
            .compose(&t)
            .approx_eq(&RigidTransform::identity(), 1e-12));
    }

    #[test]
    fn composed_transform_maps_board_points_between_cameras() {
        let (a, b) = (pose_a(), pose_b());
        let b_to_a = RigidTransform::from_board_poses(&a, &b);
        let p_board = Pt3::new(0.1, 0.06, 0.0);
        let in_a = a.transform_point(&p_board);
        let in_b = b.transform_point(&p_board);
        assert!((b_to_a.transform_point(&in_b) - in_a).norm() < 1e-12);
    }

    #[test]
    fn from_parts_roundtrips_rotation() {
        let p = pose_b();
        let back = Pose::from_parts(&p.rotation_matrix(), p.translation);
        assert!((back.rotation - p.rotation).norm() < 1e-12);
        assert_eq!(back.translation, p.translation);
    }

    #[test]
    fn row_major_rotation_layout() {
        let t = RigidTransform::new(
            Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0),
            Vec3::new(0.1, 0.2, 0.3),
        );
        assert_eq!(
            t.rotation_row_major(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert_eq!(t.translation_array(), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn non_finite_pose_is_detected() {
        let p = Pose::new(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::zeros());
        assert!(!p.is_finite());
        assert!(pose_a().is_finite());
    }
}
