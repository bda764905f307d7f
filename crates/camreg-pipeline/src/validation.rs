//! Registration consistency metrics.
//!
//! Board points located in one camera are carried into the other camera by
//! the estimated transform, projected, and compared with that camera's direct
//! detections both in pixels and as ray angles.

use camreg_core::{
    angle_between_rays, BoardGeometry, CameraIntrinsics, LensModel, MarkerDetections, Pose, Pt2,
    Real, RigidTransform,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Residual summary of one registration direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationMetrics {
    pub pixel_rms: Real,
    /// Radians.
    pub angular_rms: Real,
    pub num_points: usize,
}

/// Pixel and angular RMS between detected and predicted pixels.
///
/// Both sets are unprojected to normalized rays through `intrinsics` to
/// compute the angular error. Returns `None` for empty or mismatched sets.
pub fn registration_metrics(
    lens: &dyn LensModel,
    intrinsics: &CameraIntrinsics,
    detected: &[Pt2],
    predicted: &[Pt2],
) -> Option<RegistrationMetrics> {
    if detected.is_empty() || detected.len() != predicted.len() {
        return None;
    }

    let mut sum_px = 0.0;
    let mut sum_ang = 0.0;
    for (det, pred) in detected.iter().zip(predicted) {
        sum_px += (pred - det).norm_squared();
        let ray_det = lens.normalized_ray(det, intrinsics);
        let ray_pred = lens.normalized_ray(pred, intrinsics);
        let ang = angle_between_rays(&ray_det, &ray_pred);
        sum_ang += ang * ang;
    }
    let n = detected.len() as Real;
    Some(RegistrationMetrics {
        pixel_rms: (sum_px / n).sqrt(),
        angular_rms: (sum_ang / n).sqrt(),
        num_points: detected.len(),
    })
}

/// Detected pixels paired with the board points predicted into the target
/// camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictedCorners {
    pub detected: Vec<Pt2>,
    pub predicted: Vec<Pt2>,
    /// Ids dropped because the predicted point could not be imaged.
    pub dropped: Vec<u32>,
}

/// Predict target-camera pixels for every detected corner.
///
/// `source_pose` is the board pose in the source camera and
/// `source_to_target` maps source-camera points into the target camera.
/// Ids missing from `geometry` yield `Err(id)`.
pub fn predict_corners(
    lens: &dyn LensModel,
    target_intrinsics: &CameraIntrinsics,
    geometry: &BoardGeometry,
    target_detections: &MarkerDetections,
    source_pose: &Pose,
    source_to_target: &RigidTransform,
) -> Result<PredictedCorners, u32> {
    let mut out = PredictedCorners::default();
    for (id, det) in target_detections.ids.iter().zip(&target_detections.corners) {
        let p_board = geometry.point(*id).ok_or(*id)?;
        let in_source = source_pose.transform_point(p_board);
        let in_target = source_to_target.transform_point(&in_source);
        match lens.project(&in_target, target_intrinsics) {
            Some(px) => {
                out.detected.push(*det);
                out.predicted.push(px);
            }
            None => out.dropped.push(*id),
        }
    }
    if !out.dropped.is_empty() {
        debug!(
            "dropped {} corners that project behind the target camera: {:?}",
            out.dropped.len(),
            out.dropped
        );
    }
    Ok(out)
}
