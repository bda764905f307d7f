//! Perspective-n-point solver interface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CameraIntrinsics, Pose, Pt2, Pt3, Real};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PnpError {
    #[error("need at least {required} point correspondences, got {got}")]
    NotEnoughPoints { got: usize, required: usize },
    #[error("3D / 2D point counts differ: {points_3d} vs {points_2d}")]
    CountMismatch { points_3d: usize, points_2d: usize },
    #[error("point configuration is degenerate")]
    Degenerate,
    #[error("linear pose initialisation failed: {0}")]
    Initialisation(String),
    #[error("refinement diverged to a non-finite pose")]
    NonFinite,
}

/// Outcome of a PnP solve.
///
/// `converged == false` means the solver ran but its stopping criterion was
/// never met; callers decide whether an unconverged pose is usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnpSolution {
    pub converged: bool,
    pub pose: Pose,
    /// Pixel RMS of the final pose over all correspondences.
    pub rms_px: Real,
    pub iterations: usize,
}

/// Board pose from 2D-3D correspondences and camera intrinsics.
pub trait PoseSolver: Send + Sync {
    fn solve_pnp(
        &self,
        points_3d: &[Pt3],
        points_2d: &[Pt2],
        intrinsics: &CameraIntrinsics,
        initial_guess: &Pose,
    ) -> Result<PnpSolution, PnpError>;
}
