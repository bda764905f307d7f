//! Lens primitives used by registration and validation.
//!
//! [`LensModel`] is the seam between the registration core and a concrete
//! projection/distortion implementation.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    CameraIntrinsics, DistortionModel, IntrinsicsModel, Pinhole, ProjectionModel, Pt2, Pt3, Real,
    Vec3, DEFAULT_UNDISTORT_ITERS,
};

/// 3D point → pixel and pixel → normalized ray for a calibrated camera.
pub trait LensModel: Send + Sync {
    /// Project a camera-frame point; `None` when it cannot be imaged
    /// (behind the camera or numerically degenerate).
    fn project(&self, p_c: &Pt3, intrinsics: &CameraIntrinsics) -> Option<Pt2>;

    /// Undistorted normalized ray `(x, y, 1)` through a distorted pixel.
    fn normalized_ray(&self, px: &Pt2, intrinsics: &CameraIntrinsics) -> Vec3;
}

/// Undistortion settings for [`BrownConradyLens`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensOptions {
    pub undistort_iters: u32,
    pub undistort_tolerance: Real,
}

impl Default for LensOptions {
    fn default() -> Self {
        Self {
            undistort_iters: DEFAULT_UNDISTORT_ITERS,
            undistort_tolerance: 1e-12,
        }
    }
}

/// OpenCV-compatible pinhole lens with rational Brown-Conrady distortion.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrownConradyLens {
    pub options: LensOptions,
}

impl BrownConradyLens {
    pub fn new(options: LensOptions) -> Self {
        Self { options }
    }

    /// Undistorted normalized image coordinates of a pixel.
    pub fn undistort_pixel(&self, px: &Pt2, intrinsics: &CameraIntrinsics) -> Vector2<Real> {
        let n_d = intrinsics.k.from_pixel(&px.coords);
        intrinsics.distortion.undistort_with(
            &n_d,
            self.options.undistort_iters,
            self.options.undistort_tolerance,
        )
    }
}

impl LensModel for BrownConradyLens {
    fn project(&self, p_c: &Pt3, intrinsics: &CameraIntrinsics) -> Option<Pt2> {
        let n_u = Pinhole.project_dir(&p_c.coords)?;
        let n_d = intrinsics.distortion.distort(&n_u);
        let px = intrinsics.k.to_pixel(&n_d);
        (px.x.is_finite() && px.y.is_finite()).then(|| Pt2::from(px))
    }

    fn normalized_ray(&self, px: &Pt2, intrinsics: &CameraIntrinsics) -> Vec3 {
        Pinhole.unproject_dir(&self.undistort_pixel(px, intrinsics))
    }
}
