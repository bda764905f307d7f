//! Registration and calibration pipelines for `camreg`.
//!
//! - [`Registrar`]: estimate the board pose in two cameras, compose the
//!   camera-B → camera-A transform and validate it in both directions.
//! - [`calibrate_camera`] / [`calibrate_directory`]: batch corner detection,
//!   an [`IntrinsicsSolver`] run and the [`QualityGate`].
//! - [`io`] and [`export`]: calibration, template and report files.
//!
//! Libraries log through the `log` facade; install a subscriber in the
//! binary to see the output.

pub mod calibration;
pub mod compose;
pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod io;
pub mod quality;
pub mod registration;
pub mod test_utils;
pub mod validation;

pub use calibration::{
    calibrate_camera, calibrate_directory, list_calibration_images, CalibrationReport,
    ImageDetection, IntrinsicsSolution, IntrinsicsSolver,
};
pub use compose::{compose_transform, PoseEstimate};
pub use config::{load_config, CalibrationConfig, RegistrationConfig};
pub use detector::{BoardImage, DetectionFile, DetectorError, MarkerDetector, SidecarDetector};
pub use error::{
    BoxError, CalibrationError, CameraId, Direction, FailureKind, RegistrationError, Resource,
};
pub use export::{CalibrationBlob, RegistrationReport};
pub use quality::{CalibrationRun, GateDecision, GateRejection, QualityGate, QualityThresholds};
pub use registration::{LoadedInputs, Registrar, RegistrationInputs, RegistrationResult};
pub use validation::{
    predict_corners, registration_metrics, PredictedCorners, RegistrationMetrics,
};
