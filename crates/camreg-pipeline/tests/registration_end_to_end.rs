use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use camreg_core::synthetic::noise::UniformPixelNoise;
use camreg_core::synthetic::planar::{stereo_scene, StereoScene};
use camreg_core::{BoardTemplate, BrownConradyLens, MarkerDetections, Vec2};
use camreg_linear::IterativePnp;
use camreg_pipeline::test_utils::{CountingDetector, SyntheticDetector};
use camreg_pipeline::{
    io, BoardImage, CameraId, DetectorError, Direction, FailureKind, MarkerDetector, Registrar,
    RegistrationConfig, RegistrationError, RegistrationInputs, Resource, SidecarDetector,
};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

/// Write a complete registration dataset into `dir`.
fn write_dataset(
    dir: &Path,
    scene: &StereoScene,
    det_a: &MarkerDetections,
    det_b: &MarkerDetections,
) -> RegistrationInputs {
    let inputs = RegistrationInputs {
        image_a: dir.join("cam_a.png"),
        image_b: dir.join("cam_b.png"),
        template: dir.join("template.json"),
        calib_a: dir.join("calib_a.json"),
        calib_b: dir.join("calib_b.json"),
    };
    SyntheticDetector::save_image(&inputs.image_a, 1, WIDTH, HEIGHT).unwrap();
    SyntheticDetector::save_image(&inputs.image_b, 2, WIDTH, HEIGHT).unwrap();
    SidecarDetector::write(&inputs.image_a, det_a).unwrap();
    SidecarDetector::write(&inputs.image_b, det_b).unwrap();
    io::write_template(&inputs.template, &scene.board).unwrap();
    io::write_calibration(&inputs.calib_a, &scene.intrinsics_a).unwrap();
    io::write_calibration(&inputs.calib_b, &scene.intrinsics_b).unwrap();
    inputs
}

/// Shifts the corners of one tagged image on every detection after the first,
/// so that image's pose comes from clean corners but its validation does not.
struct ShiftOnRevisit {
    inner: SyntheticDetector,
    tag: u8,
    shift: Vec2,
    seen: AtomicUsize,
}

impl MarkerDetector for ShiftOnRevisit {
    fn detect(
        &self,
        image: &BoardImage,
        board: &BoardTemplate,
    ) -> Result<MarkerDetections, DetectorError> {
        let mut det = self.inner.detect(image, board)?;
        if image.pixels.get_pixel(0, 0).0[0] == self.tag
            && self.seen.fetch_add(1, Ordering::SeqCst) > 0
        {
            for c in &mut det.corners {
                *c += self.shift;
            }
        }
        Ok(det)
    }
}

fn sidecar_registrar(
    config: RegistrationConfig,
) -> Registrar<SidecarDetector, IterativePnp, BrownConradyLens> {
    Registrar::with_detector(SidecarDetector, config)
}

#[test]
fn noiseless_files_recover_ground_truth() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());

    let result = sidecar_registrar(RegistrationConfig::default())
        .register_files(&inputs)
        .unwrap();

    assert!(result.transform.approx_eq(&scene.b_to_a(), 1e-6));
    assert!(result.transform.is_rigid(1e-9));
    assert!(result.metrics_b_to_a.angular_rms < 1e-6);
    assert!(result.metrics_a_to_b.angular_rms < 1e-6);
    assert!(result.metrics_b_to_a.pixel_rms < 1e-3);
    assert_eq!(result.metrics_a_to_b.num_points, scene.board.corner_count());
}

#[test]
fn noisy_detections_stay_within_default_threshold() {
    let scene = stereo_scene().unwrap();
    let noise = UniformPixelNoise::new(7, 0.2);
    let det_a = noise.perturb(0, &scene.detections_a());
    let det_b = noise.perturb(1, &scene.detections_b());
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &det_a, &det_b);

    let result = sidecar_registrar(RegistrationConfig::default())
        .register_files(&inputs)
        .unwrap();
    assert!(result.metrics_b_to_a.angular_rms > 0.0);
    assert!(result.metrics_b_to_a.angular_rms < 1e-3);
    assert!(result.metrics_a_to_b.angular_rms < 1e-3);
    assert!((result.transform.translation - scene.b_to_a().translation).norm() < 0.01);
}

#[test]
fn tight_threshold_rejects_forward_direction() {
    let scene = stereo_scene().unwrap();
    let noise = UniformPixelNoise::new(11, 0.5);
    let det_a = noise.perturb(0, &scene.detections_a());
    let det_b = noise.perturb(1, &scene.detections_b());
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &det_a, &det_b);

    let config = RegistrationConfig {
        rms_threshold_rad: 1e-9,
        ..RegistrationConfig::default()
    };
    let err = sidecar_registrar(config).register_files(&inputs).unwrap_err();
    match err {
        RegistrationError::ThresholdExceeded {
            direction,
            metrics,
            threshold,
        } => {
            assert_eq!(direction, Direction::BToA);
            assert!(metrics.angular_rms > threshold);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_files_are_reported_in_check_order() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());
    std::fs::remove_file(&inputs.calib_a).unwrap();
    std::fs::remove_file(&inputs.image_b).unwrap();
    let reg = sidecar_registrar(RegistrationConfig::default());

    let err = reg.register_files(&inputs).unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::MissingResource {
            resource: Resource::Image(CameraId::B),
            ..
        }
    ));
    assert_eq!(err.kind(), FailureKind::Precondition);

    SyntheticDetector::save_image(&inputs.image_b, 2, WIDTH, HEIGHT).unwrap();
    let err = reg.register_files(&inputs).unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::MissingResource {
            resource: Resource::Calibration(CameraId::A),
            ..
        }
    ));
}

#[test]
fn invalid_template_is_rejected_before_decoding() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());
    std::fs::write(&inputs.template, r#"{"shapes": "nope"}"#).unwrap();
    std::fs::write(&inputs.image_a, b"not a png").unwrap();

    let err = sidecar_registrar(RegistrationConfig::default())
        .register_files(&inputs)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::InvalidResource {
            resource: Resource::Template,
            ..
        }
    ));
}

#[test]
fn undecodable_image_a_fails_before_any_detection() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());
    std::fs::write(&inputs.image_a, b"\x89PNG garbage").unwrap();

    let detector = CountingDetector::new(SidecarDetector);
    let reg = Registrar::with_detector(detector, RegistrationConfig::default());
    let err = reg.register_files(&inputs).unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::UnreadableImage {
            camera: CameraId::A,
            ..
        }
    ));
    assert_eq!(err.camera(), Some(CameraId::A));
    assert_eq!(reg.detector.calls(), 0);
}

#[test]
fn missing_sidecar_means_pose_not_found() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());
    std::fs::remove_file(SidecarDetector::sidecar_path(&inputs.image_b)).unwrap();

    let err = sidecar_registrar(RegistrationConfig::default())
        .register_files(&inputs)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::PoseNotFound {
            camera: CameraId::B,
            detected: 0
        }
    ));
}

#[test]
fn reverse_direction_is_checked_after_forward_passes() {
    let scene = stereo_scene().unwrap();
    let detector = ShiftOnRevisit {
        inner: SyntheticDetector::new()
            .with(1, scene.detections_a())
            .with(2, scene.detections_b()),
        tag: 2,
        shift: Vec2::new(6.0, -4.0),
        seen: AtomicUsize::new(0),
    };
    let reg = Registrar::with_detector(detector, RegistrationConfig::default());

    let err = reg
        .register(
            &SyntheticDetector::image(1, WIDTH, HEIGHT),
            &SyntheticDetector::image(2, WIDTH, HEIGHT),
            &scene.board,
            &scene.intrinsics_a,
            &scene.intrinsics_b,
        )
        .unwrap_err();
    match err {
        RegistrationError::ThresholdExceeded {
            direction,
            metrics,
            threshold,
        } => {
            assert_eq!(direction, Direction::AToB);
            assert!(metrics.angular_rms > threshold);
            assert!(metrics.pixel_rms > 5.0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(reg.detector.seen.load(Ordering::SeqCst), 2);
}

#[test]
fn loaded_inputs_carry_parsed_calibrations() {
    let scene = stereo_scene().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_dataset(dir.path(), &scene, &scene.detections_a(), &scene.detections_b());

    let loaded = inputs.load().unwrap();
    assert_eq!(loaded.intrinsics_a, scene.intrinsics_a);
    assert_eq!(loaded.intrinsics_b, scene.intrinsics_b);
    assert_eq!(loaded.board, scene.board);
    assert_eq!(loaded.image_b.path.as_deref(), Some(inputs.image_b.as_path()));
}
