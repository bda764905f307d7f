//! Synthetic planar board helpers.
//!
//! Board geometry comes from [`BoardTemplate`]; poses are board-to-camera
//! [`Pose`] values; detections are produced by projecting through
//! [`CameraIntrinsics::camera`].

use anyhow::Result;

use crate::{
    BoardTemplate, CameraIntrinsics, CorrespondenceView, ImageSize, Mat3, MarkerDetections, Pose,
    Pt2, Real, RigidTransform, Vec3,
};

/// Generate `n_views` poses with a yaw around +Y and a Z translation ramp.
///
/// `offset` is added to every translation so the board can be centred on the
/// optical axis.
pub fn poses_yaw_y_z(
    n_views: usize,
    yaw_start_rad: Real,
    yaw_step_rad: Real,
    z_start: Real,
    z_step: Real,
    offset: Vec3,
) -> Vec<Pose> {
    (0..n_views)
        .map(|view_idx| {
            let yaw = yaw_start_rad + yaw_step_rad * view_idx as Real;
            let z = z_start + z_step * view_idx as Real;
            Pose::new(Vec3::new(0.0, yaw, 0.0), Vec3::new(0.0, 0.0, z) + offset)
        })
        .collect()
}

/// Project every board corner, keeping only those that land in front of
/// the camera.
pub fn project_board(
    intrinsics: &CameraIntrinsics,
    pose: &Pose,
    board: &BoardTemplate,
) -> MarkerDetections {
    let camera = intrinsics.camera();
    let mut detections = MarkerDetections::empty();
    for (id, p_board) in board.geometry().iter() {
        let p_c = pose.transform_point(p_board);
        if let Some(uv) = camera.project_point(&p_c) {
            detections.corners.push(Pt2::from(uv));
            detections.ids.push(id);
        }
    }
    detections
}

/// Project every board corner, requiring all of them to be visible.
pub fn project_view_all(
    intrinsics: &CameraIntrinsics,
    pose: &Pose,
    board: &BoardTemplate,
) -> Result<CorrespondenceView> {
    let detections = project_board(intrinsics, pose, board);
    anyhow::ensure!(
        detections.len() == board.corner_count(),
        "only {} of {} board corners are projectable",
        detections.len(),
        board.corner_count()
    );
    CorrespondenceView::from_detections(&board.geometry(), &detections)
}

/// Two calibrated cameras observing one board at the same instant.
#[derive(Debug, Clone)]
pub struct StereoScene {
    pub board: BoardTemplate,
    pub intrinsics_a: CameraIntrinsics,
    pub intrinsics_b: CameraIntrinsics,
    pub pose_a: Pose,
    pub pose_b: Pose,
}

impl StereoScene {
    /// Ground-truth transform from camera B's frame to camera A's frame.
    pub fn b_to_a(&self) -> RigidTransform {
        RigidTransform::from_board_poses(&self.pose_a, &self.pose_b)
    }

    pub fn detections_a(&self) -> MarkerDetections {
        project_board(&self.intrinsics_a, &self.pose_a, &self.board)
    }

    pub fn detections_b(&self) -> MarkerDetections {
        project_board(&self.intrinsics_b, &self.pose_b, &self.board)
    }
}

/// A 9×7 board (30 mm squares) seen by two distorted 1280×720 cameras.
pub fn stereo_scene() -> Result<StereoScene> {
    let board = BoardTemplate::from_millimeters(9, 7, 30.0, 22.0, "DICT_5X5_1000")?;
    let size = ImageSize::new(1280, 720);

    let k_a = Mat3::new(900.0, 0.0, 640.0, 0.0, 905.0, 360.0, 0.0, 0.0, 1.0);
    let intrinsics_a = CameraIntrinsics::from_k_matrix(
        &k_a,
        &[-0.12, 0.03, 0.0005, -0.0003, 0.0, 0.01, 0.0, 0.0],
        size,
    )?;
    let k_b = Mat3::new(870.0, 0.0, 652.0, 0.0, 868.0, 351.0, 0.0, 0.0, 1.0);
    let intrinsics_b = CameraIntrinsics::from_k_matrix(
        &k_b,
        &[-0.08, 0.015, -0.0004, 0.0002, -0.002, 0.005, 0.001, 0.0],
        size,
    )?;

    let pose_a = Pose::new(Vec3::new(0.1, -0.15, 0.05), Vec3::new(-0.13, -0.1, 0.7));
    let pose_b = Pose::new(Vec3::new(-0.05, 0.25, -0.02), Vec3::new(-0.16, -0.1, 0.75));

    Ok(StereoScene {
        board,
        intrinsics_a,
        intrinsics_b,
        pose_a,
        pose_b,
    })
}
