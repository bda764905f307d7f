//! Two-camera registration against a shared board.
//!
//! Each camera's board pose is estimated independently, the two poses are
//! composed into a camera-B → camera-A transform, and the transform is
//! checked by carrying board points across in both directions.

use std::path::{Path, PathBuf};

use camreg_core::{
    BoardTemplate, BrownConradyLens, CameraIntrinsics, CorrespondenceView, LensModel,
    MarkerDetections, Pose, PoseSolver, RigidTransform,
};
use camreg_linear::IterativePnp;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::compose::{compose_transform, PoseEstimate};
use crate::config::RegistrationConfig;
use crate::detector::{BoardImage, MarkerDetector};
use crate::error::{CameraId, Direction, RegistrationError, Resource};
use crate::io;
use crate::validation::{predict_corners, registration_metrics, RegistrationMetrics};

/// Accepted registration: transform plus the consistency metrics of both
/// directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationResult {
    /// Maps camera-B coordinates into camera A.
    pub transform: RigidTransform,
    pub metrics_b_to_a: RegistrationMetrics,
    pub metrics_a_to_b: RegistrationMetrics,
}

/// Input files of a registration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationInputs {
    pub image_a: PathBuf,
    pub image_b: PathBuf,
    pub template: PathBuf,
    pub calib_a: PathBuf,
    pub calib_b: PathBuf,
}

/// Registration driver over swappable detector, pose solver and lens.
#[derive(Debug, Clone)]
pub struct Registrar<D, S, L> {
    pub detector: D,
    pub solver: S,
    pub lens: L,
    pub config: RegistrationConfig,
}

impl<D: MarkerDetector> Registrar<D, IterativePnp, BrownConradyLens> {
    /// Registrar using [`IterativePnp`] and [`BrownConradyLens`] configured
    /// from `config`.
    pub fn with_detector(detector: D, config: RegistrationConfig) -> Self {
        Self {
            solver: IterativePnp::new(config.pnp),
            lens: BrownConradyLens::new(config.lens),
            detector,
            config,
        }
    }
}

impl<D, S, L> Registrar<D, S, L>
where
    D: MarkerDetector,
    S: PoseSolver,
    L: LensModel,
{
    pub fn new(detector: D, solver: S, lens: L, config: RegistrationConfig) -> Self {
        Self {
            detector,
            solver,
            lens,
            config,
        }
    }

    fn detect(
        &self,
        camera: CameraId,
        image: &BoardImage,
        board: &BoardTemplate,
    ) -> Result<MarkerDetections, RegistrationError> {
        if image.is_empty() {
            return Err(RegistrationError::EmptyImage { camera });
        }
        self.detector
            .detect(image, board)
            .map_err(|source| RegistrationError::Detector { camera, source })
    }

    /// Board pose in one camera.
    ///
    /// Fewer than `min_corners` detections is not an error: the estimate is
    /// [`PoseEstimate::NotFound`].
    pub fn estimate_pose(
        &self,
        camera: CameraId,
        image: &BoardImage,
        board: &BoardTemplate,
        intrinsics: &CameraIntrinsics,
    ) -> Result<PoseEstimate, RegistrationError> {
        if image.size() != intrinsics.image_size {
            warn!(
                "{camera}: image is {}x{} but calibration is for {}x{}",
                image.size().width,
                image.size().height,
                intrinsics.image_size.width,
                intrinsics.image_size.height
            );
        }

        let detections = self.detect(camera, image, board)?;
        let min_corners = self.config.min_corners.max(camreg_linear::PNP_MIN_POINTS);
        if detections.len() < min_corners {
            info!(
                "{camera}: {} corners detected, {} required",
                detections.len(),
                min_corners
            );
            return Ok(PoseEstimate::NotFound {
                detected: detections.len(),
            });
        }

        let view = correspondences(camera, board, &detections)?;
        let guess = Pose::splat(self.config.initial_guess);
        let solution = self
            .solver
            .solve_pnp(&view.points_3d, &view.points_2d, intrinsics, &guess)
            .map_err(|source| RegistrationError::PoseSolver { camera, source })?;
        if !solution.converged {
            return Err(RegistrationError::PoseNotConverged { camera });
        }
        debug!(
            "{camera}: pose from {} corners, reprojection rms {:.4} px after {} iterations",
            view.len(),
            solution.rms_px,
            solution.iterations
        );
        Ok(PoseEstimate::Found(solution.pose))
    }

    /// Like [`Self::estimate_pose`], with "not found" turned into an error.
    pub fn pose_for_camera(
        &self,
        camera: CameraId,
        image: &BoardImage,
        board: &BoardTemplate,
        intrinsics: &CameraIntrinsics,
    ) -> Result<Pose, RegistrationError> {
        match self.estimate_pose(camera, image, board, intrinsics)? {
            PoseEstimate::Found(pose) => Ok(pose),
            PoseEstimate::NotFound { detected } => {
                Err(RegistrationError::PoseNotFound { camera, detected })
            }
        }
    }

    /// Consistency of `source_to_target` against direct detections in the
    /// target image.
    ///
    /// Board points are placed with `source_pose`, moved into the target
    /// camera and projected; the result is compared with the target's
    /// detected corners.
    pub fn validate(
        &self,
        target: CameraId,
        target_image: &BoardImage,
        board: &BoardTemplate,
        target_intrinsics: &CameraIntrinsics,
        source_pose: &Pose,
        source_to_target: &RigidTransform,
    ) -> Result<RegistrationMetrics, RegistrationError> {
        let direction = match target {
            CameraId::A => Direction::BToA,
            CameraId::B => Direction::AToB,
        };
        let detections = self.detect(target, target_image, board)?;
        let predicted = predict_corners(
            &self.lens,
            target_intrinsics,
            &board.geometry(),
            &detections,
            source_pose,
            source_to_target,
        )
        .map_err(|id| RegistrationError::UnknownMarker { camera: target, id })?;

        let metrics = registration_metrics(
            &self.lens,
            target_intrinsics,
            &predicted.detected,
            &predicted.predicted,
        )
        .ok_or(RegistrationError::NoMarkers { direction })?;
        info!(
            "RMS {direction}: {:.4} px, {:.6} rad over {} corners",
            metrics.pixel_rms, metrics.angular_rms, metrics.num_points
        );
        Ok(metrics)
    }

    fn check_threshold(
        &self,
        direction: Direction,
        metrics: RegistrationMetrics,
    ) -> Result<RegistrationMetrics, RegistrationError> {
        let threshold = self.config.rms_threshold_rad;
        // NaN never passes.
        if !(metrics.angular_rms <= threshold) {
            return Err(RegistrationError::ThresholdExceeded {
                direction,
                metrics,
                threshold,
            });
        }
        Ok(metrics)
    }

    /// Estimate and validate the camera-B → camera-A transform.
    pub fn register(
        &self,
        image_a: &BoardImage,
        image_b: &BoardImage,
        board: &BoardTemplate,
        intrinsics_a: &CameraIntrinsics,
        intrinsics_b: &CameraIntrinsics,
    ) -> Result<RegistrationResult, RegistrationError> {
        let pose_a = self.pose_for_camera(CameraId::A, image_a, board, intrinsics_a)?;
        let pose_b = self.pose_for_camera(CameraId::B, image_b, board, intrinsics_b)?;

        let transform =
            compose_transform(&PoseEstimate::Found(pose_a), &PoseEstimate::Found(pose_b))?;
        info!(
            "transform B to A: translation {:?}, rotation {:?}",
            transform.translation_array(),
            transform.rotation_row_major()
        );

        let forward = self.validate(
            CameraId::A,
            image_a,
            board,
            intrinsics_a,
            &pose_b,
            &transform,
        )?;
        let metrics_b_to_a = self.check_threshold(Direction::BToA, forward)?;

        let reverse = self.validate(
            CameraId::B,
            image_b,
            board,
            intrinsics_b,
            &pose_a,
            &transform.inverse(),
        )?;
        let metrics_a_to_b = self.check_threshold(Direction::AToB, reverse)?;

        Ok(RegistrationResult {
            transform,
            metrics_b_to_a,
            metrics_a_to_b,
        })
    }

    /// [`Self::register`] over files, failing fast on the first missing,
    /// invalid or undecodable input.
    pub fn register_files(
        &self,
        inputs: &RegistrationInputs,
    ) -> Result<RegistrationResult, RegistrationError> {
        let loaded = inputs.load()?;
        self.register(
            &loaded.image_a,
            &loaded.image_b,
            &loaded.board,
            &loaded.intrinsics_a,
            &loaded.intrinsics_b,
        )
    }
}

/// Parsed and decoded registration inputs.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub board: BoardTemplate,
    pub intrinsics_a: CameraIntrinsics,
    pub intrinsics_b: CameraIntrinsics,
    pub image_a: BoardImage,
    pub image_b: BoardImage,
}

impl RegistrationInputs {
    /// Check, parse and decode every input, in that order.
    ///
    /// Existence is checked for all five files before anything is parsed,
    /// and both images are decoded only after every JSON file parsed.
    pub fn load(&self) -> Result<LoadedInputs, RegistrationError> {
        let required = [
            (Resource::Image(CameraId::A), &self.image_a),
            (Resource::Image(CameraId::B), &self.image_b),
            (Resource::Template, &self.template),
            (Resource::Calibration(CameraId::A), &self.calib_a),
            (Resource::Calibration(CameraId::B), &self.calib_b),
        ];
        for (resource, path) in required {
            if !path.exists() {
                return Err(RegistrationError::MissingResource {
                    resource,
                    path: path.clone(),
                });
            }
        }

        let board = io::load_template(&self.template)
            .map_err(|e| invalid(Resource::Template, &self.template, e))?;
        let intrinsics_a = io::load_calibration(&self.calib_a)
            .map_err(|e| invalid(Resource::Calibration(CameraId::A), &self.calib_a, e))?;
        let intrinsics_b = io::load_calibration(&self.calib_b)
            .map_err(|e| invalid(Resource::Calibration(CameraId::B), &self.calib_b, e))?;

        Ok(LoadedInputs {
            image_a: decode(CameraId::A, &self.image_a)?,
            image_b: decode(CameraId::B, &self.image_b)?,
            board,
            intrinsics_a,
            intrinsics_b,
        })
    }
}

fn correspondences(
    camera: CameraId,
    board: &BoardTemplate,
    detections: &MarkerDetections,
) -> Result<CorrespondenceView, RegistrationError> {
    let geometry = board.geometry();
    if let Some(id) = detections.ids.iter().find(|id| geometry.point(**id).is_none()) {
        return Err(RegistrationError::UnknownMarker { camera, id: *id });
    }
    CorrespondenceView::from_detections(&geometry, detections)
        .map_err(|_| RegistrationError::InvalidPose { camera })
}

fn invalid(resource: Resource, path: &Path, err: anyhow::Error) -> RegistrationError {
    RegistrationError::InvalidResource {
        resource,
        path: path.to_path_buf(),
        source: err.into(),
    }
}

fn decode(camera: CameraId, path: &Path) -> Result<BoardImage, RegistrationError> {
    BoardImage::open(path).map_err(|source| RegistrationError::UnreadableImage {
        camera,
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SyntheticDetector;
    use camreg_core::synthetic::planar;
    use camreg_core::{rotation_angle_between, Pt2};

    fn registrar(
        scene: &planar::StereoScene,
    ) -> Registrar<SyntheticDetector, IterativePnp, BrownConradyLens> {
        let detector = SyntheticDetector::new()
            .with(1, scene.detections_a())
            .with(2, scene.detections_b());
        Registrar::with_detector(detector, RegistrationConfig::default())
    }

    #[test]
    fn estimates_pose_per_camera() {
        let scene = planar::stereo_scene().unwrap();
        let reg = registrar(&scene);
        let image = SyntheticDetector::image(1, 1280, 720);
        let pose = reg
            .pose_for_camera(CameraId::A, &image, &scene.board, &scene.intrinsics_a)
            .unwrap();
        assert!((pose.translation - scene.pose_a.translation).norm() < 1e-8);
        let ang = rotation_angle_between(&pose.rotation_matrix(), &scene.pose_a.rotation_matrix());
        assert!(ang < 1e-8);
    }

    #[test]
    fn too_few_corners_is_not_found() {
        let scene = planar::stereo_scene().unwrap();
        let few = MarkerDetections::new(
            vec![Pt2::new(10.0, 10.0), Pt2::new(20.0, 10.0), Pt2::new(30.0, 10.0)],
            vec![0, 1, 2],
        )
        .unwrap();
        let reg = Registrar::with_detector(
            SyntheticDetector::new().with(3, few),
            RegistrationConfig::default(),
        );
        let image = SyntheticDetector::image(3, 1280, 720);

        let est = reg
            .estimate_pose(CameraId::B, &image, &scene.board, &scene.intrinsics_b)
            .unwrap();
        assert_eq!(est, PoseEstimate::NotFound { detected: 3 });

        let err = reg
            .pose_for_camera(CameraId::B, &image, &scene.board, &scene.intrinsics_b)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::PoseNotFound {
                camera: CameraId::B,
                detected: 3
            }
        ));
    }

    #[test]
    fn unknown_corner_ids_are_rejected() {
        let scene = planar::stereo_scene().unwrap();
        let mut det = scene.detections_a();
        det.ids[0] = 999;
        let reg = Registrar::with_detector(
            SyntheticDetector::new().with(1, det),
            RegistrationConfig::default(),
        );
        let err = reg
            .estimate_pose(
                CameraId::A,
                &SyntheticDetector::image(1, 1280, 720),
                &scene.board,
                &scene.intrinsics_a,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::UnknownMarker {
                camera: CameraId::A,
                id: 999
            }
        ));
    }

    #[test]
    fn empty_image_is_a_precondition_failure() {
        let scene = planar::stereo_scene().unwrap();
        let reg = registrar(&scene);
        let empty = BoardImage::new(image::GrayImage::new(0, 0));
        let err = reg
            .estimate_pose(CameraId::A, &empty, &scene.board, &scene.intrinsics_a)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::EmptyImage {
                camera: CameraId::A
            }
        ));
    }

    #[test]
    fn registers_noiseless_scene() {
        let scene = planar::stereo_scene().unwrap();
        let reg = registrar(&scene);
        let result = reg
            .register(
                &SyntheticDetector::image(1, 1280, 720),
                &SyntheticDetector::image(2, 1280, 720),
                &scene.board,
                &scene.intrinsics_a,
                &scene.intrinsics_b,
            )
            .unwrap();
        assert!(result.transform.approx_eq(&scene.b_to_a(), 1e-7));
        assert!(result.metrics_b_to_a.angular_rms < 1e-7);
        assert!(result.metrics_a_to_b.angular_rms < 1e-7);
        assert_eq!(result.metrics_b_to_a.num_points, scene.board.corner_count());
    }

    #[test]
    fn validation_uses_the_target_detections() {
        let scene = planar::stereo_scene().unwrap();
        let reg = registrar(&scene);
        let metrics = reg
            .validate(
                CameraId::B,
                &SyntheticDetector::image(2, 1280, 720),
                &scene.board,
                &scene.intrinsics_b,
                &scene.pose_a,
                &scene.b_to_a().inverse(),
            )
            .unwrap();
        assert!(metrics.pixel_rms < 1e-6);

        // A wrong transform shows up as a large error.
        let wrong = RigidTransform::identity();
        let metrics = reg
            .validate(
                CameraId::B,
                &SyntheticDetector::image(2, 1280, 720),
                &scene.board,
                &scene.intrinsics_b,
                &scene.pose_a,
                &wrong,
            )
            .unwrap();
        assert!(metrics.angular_rms > 0.01);
    }
}
