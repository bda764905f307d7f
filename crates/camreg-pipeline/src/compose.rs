//! Camera-to-camera transform from two board observations.

use camreg_core::{Pose, RigidTransform};
use serde::{Deserialize, Serialize};

use crate::error::{CameraId, RegistrationError};

/// Result of estimating the board pose in one camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PoseEstimate {
    Found(Pose),
    /// Too few corners were detected to attempt a solve.
    NotFound { detected: usize },
}

impl PoseEstimate {
    pub fn pose(&self) -> Option<&Pose> {
        match self {
            PoseEstimate::Found(pose) => Some(pose),
            PoseEstimate::NotFound { .. } => None,
        }
    }
}

fn usable_pose(estimate: &PoseEstimate, camera: CameraId) -> Result<&Pose, RegistrationError> {
    estimate
        .pose()
        .filter(|p| p.is_finite())
        .ok_or(RegistrationError::InvalidPose { camera })
}

/// Transform mapping camera-B coordinates into camera A.
pub fn compose_transform(
    pose_a: &PoseEstimate,
    pose_b: &PoseEstimate,
) -> Result<RigidTransform, RegistrationError> {
    let a = usable_pose(pose_a, CameraId::A)?;
    let b = usable_pose(pose_b, CameraId::B)?;
    Ok(RigidTransform::from_board_poses(a, b))
}
