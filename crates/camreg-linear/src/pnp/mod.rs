//! Perspective-n-Point pose estimation.
//!
//! [`IterativePnp`] mirrors the classic iterative solvePnP: undistort the
//! observations, initialise linearly (homography for planar boards, DLT for
//! general 3D layouts), then refine reprojection error through the full
//! distorted camera with damped Gauss-Newton.
//!
//! All poses map board coordinates into the camera frame.

use camreg_core::{
    CameraIntrinsics, CorrespondenceView, Mat3, PnpError, PnpSolution, Pose, PoseSolver, Pt2, Pt3,
    Real,
};
use log::debug;
use serde::{Deserialize, Serialize};

mod dlt;
mod refine;

pub use dlt::{dlt, DLT_MIN_POINTS};

use crate::{dlt_homography, pose_from_homography};

/// Minimum number of correspondences accepted by [`IterativePnp`].
pub const PNP_MIN_POINTS: usize = 4;

/// Tolerance on `|z|` for treating board points as planar.
const PLANAR_TOLERANCE: Real = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnpOptions {
    pub max_iters: usize,
    /// Relative parameter step below which refinement stops.
    pub step_tolerance: Real,
    /// Cost floor and relative cost decrease below which refinement stops.
    pub cost_tolerance: Real,
    pub initial_damping: Real,
    /// Start refinement from the caller's guess instead of the linear
    /// initialisation.
    pub use_extrinsic_guess: bool,
}

impl Default for PnpOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            step_tolerance: 1e-10,
            cost_tolerance: 1e-14,
            initial_damping: 1e-3,
            use_extrinsic_guess: false,
        }
    }
}

/// Linear initialisation followed by nonlinear refinement.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterativePnp {
    pub options: PnpOptions,
}

impl IterativePnp {
    pub fn new(options: PnpOptions) -> Self {
        Self { options }
    }

    /// `normalized` pairs board points with undistorted normalized coordinates.
    fn linear_init(
        &self,
        normalized: &CorrespondenceView,
        initial_guess: &Pose,
    ) -> Result<Pose, PnpError> {
        if self.options.use_extrinsic_guess {
            return Ok(*initial_guess);
        }

        if normalized.is_planar(PLANAR_TOLERANCE) {
            let h = dlt_homography(&normalized.planar_points(), &normalized.points_2d)
                .map_err(|e| PnpError::Initialisation(e.to_string()))?;
            return pose_from_homography(&Mat3::identity(), &h)
                .map_err(|e| PnpError::Initialisation(e.to_string()));
        }
        if normalized.len() >= DLT_MIN_POINTS {
            return dlt(&normalized.points_3d, &normalized.points_2d);
        }
        debug!(
            "{} non-planar points are too few for DLT, refining from the initial guess",
            normalized.len()
        );
        Ok(*initial_guess)
    }

    /// Convenience wrapper over a correspondence view.
    pub fn solve_view(
        &self,
        view: &CorrespondenceView,
        intrinsics: &CameraIntrinsics,
        initial_guess: &Pose,
    ) -> Result<PnpSolution, PnpError> {
        self.solve_pnp(&view.points_3d, &view.points_2d, intrinsics, initial_guess)
    }
}

impl PoseSolver for IterativePnp {
    fn solve_pnp(
        &self,
        points_3d: &[Pt3],
        points_2d: &[Pt2],
        intrinsics: &CameraIntrinsics,
        initial_guess: &Pose,
    ) -> Result<PnpSolution, PnpError> {
        let n = points_3d.len();
        if points_2d.len() != n {
            return Err(PnpError::CountMismatch {
                points_3d: n,
                points_2d: points_2d.len(),
            });
        }
        if n < PNP_MIN_POINTS {
            return Err(PnpError::NotEnoughPoints {
                got: n,
                required: PNP_MIN_POINTS,
            });
        }

        let camera = intrinsics.camera();
        let normalized = CorrespondenceView {
            points_3d: points_3d.to_vec(),
            points_2d: points_2d
                .iter()
                .map(|px| Pt2::from(camera.normalize_pixel(&px.coords)))
                .collect(),
        };

        let init = self.linear_init(&normalized, initial_guess)?;
        let refined =
            refine::refine_pose(points_3d, points_2d, intrinsics, &init, &self.options)?;
        let rms_px = (refined.cost / n as Real).sqrt();
        debug!(
            "pnp: {} points, {} iterations, rms {:.4} px, converged {}",
            n, refined.iterations, rms_px, refined.converged
        );

        Ok(PnpSolution {
            converged: refined.converged && rms_px.is_finite(),
            pose: refined.pose,
            rms_px,
            iterations: refined.iterations,
        })
    }
}
