//! Error types of the registration and calibration pipelines.

use std::fmt;
use std::path::PathBuf;

use camreg_core::{PnpError, Real};
use thiserror::Error;

use crate::detector::DetectorError;
use crate::validation::RegistrationMetrics;

/// Boxed error used at trait seams whose implementations are external.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification so callers can branch without matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Missing, unreadable or invalid inputs; too little data.
    Precondition,
    /// Non-convergence, threshold violations or solver failures.
    Computation,
}

/// One of the two cameras of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraId {
    A,
    B,
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraId::A => write!(f, "camera A"),
            CameraId::B => write!(f, "camera B"),
        }
    }
}

/// Direction of a registration consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Board points from camera B projected into camera A.
    BToA,
    /// Board points from camera A projected into camera B.
    AToB,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::BToA => write!(f, "B to A"),
            Direction::AToB => write!(f, "A to B"),
        }
    }
}

/// Input files a run depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Image(CameraId),
    Template,
    Calibration(CameraId),
    ImageDirectory,
    InitialCalibration,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Image(cam) => write!(f, "image for {cam}"),
            Resource::Template => write!(f, "board template"),
            Resource::Calibration(cam) => write!(f, "calibration for {cam}"),
            Resource::ImageDirectory => write!(f, "image directory"),
            Resource::InitialCalibration => write!(f, "initial calibration"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{resource} not found: {}", .path.display())]
    MissingResource { resource: Resource, path: PathBuf },
    #[error("{resource} at {} is invalid: {source}", .path.display())]
    InvalidResource {
        resource: Resource,
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("cannot decode image for {camera}: {}", .path.display())]
    UnreadableImage {
        camera: CameraId,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image for {camera} is empty")]
    EmptyImage { camera: CameraId },
    #[error("marker detection failed for {camera}")]
    Detector {
        camera: CameraId,
        #[source]
        source: DetectorError,
    },
    #[error("{camera} detected corner id {id} that the board does not have")]
    UnknownMarker { camera: CameraId, id: u32 },
    #[error("pose not found for {camera}: only {detected} corners detected")]
    PoseNotFound { camera: CameraId, detected: usize },
    #[error("pose could not be estimated for {camera}")]
    PoseNotConverged { camera: CameraId },
    #[error("pose solver failed for {camera}")]
    PoseSolver {
        camera: CameraId,
        #[source]
        source: PnpError,
    },
    #[error("pose for {camera} is missing or not finite")]
    InvalidPose { camera: CameraId },
    #[error("no markers available to validate the {direction} registration")]
    NoMarkers { direction: Direction },
    #[error(
        "{direction} registration error {:.6} rad exceeds threshold {threshold} rad",
        .metrics.angular_rms
    )]
    ThresholdExceeded {
        direction: Direction,
        metrics: RegistrationMetrics,
        threshold: Real,
    },
}

impl RegistrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistrationError::MissingResource { .. }
            | RegistrationError::InvalidResource { .. }
            | RegistrationError::UnreadableImage { .. }
            | RegistrationError::EmptyImage { .. }
            | RegistrationError::Detector { .. }
            | RegistrationError::UnknownMarker { .. }
            | RegistrationError::PoseNotFound { .. }
            | RegistrationError::NoMarkers { .. } => FailureKind::Precondition,
            RegistrationError::PoseNotConverged { .. }
            | RegistrationError::PoseSolver { .. }
            | RegistrationError::InvalidPose { .. }
            | RegistrationError::ThresholdExceeded { .. } => FailureKind::Computation,
        }
    }

    /// Camera the failure is attributed to, when there is one.
    pub fn camera(&self) -> Option<CameraId> {
        match self {
            RegistrationError::MissingResource { resource, .. }
            | RegistrationError::InvalidResource { resource, .. } => match resource {
                Resource::Image(cam) | Resource::Calibration(cam) => Some(*cam),
                _ => None,
            },
            RegistrationError::UnreadableImage { camera, .. }
            | RegistrationError::EmptyImage { camera }
            | RegistrationError::Detector { camera, .. }
            | RegistrationError::UnknownMarker { camera, .. }
            | RegistrationError::PoseNotFound { camera, .. }
            | RegistrationError::PoseNotConverged { camera }
            | RegistrationError::PoseSolver { camera, .. }
            | RegistrationError::InvalidPose { camera } => Some(*camera),
            RegistrationError::NoMarkers { .. } | RegistrationError::ThresholdExceeded { .. } => {
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("only {found} calibration images found, need at least {required}")]
    NotEnoughImages { found: usize, required: usize },
    #[error("only {found} images with board detections, need at least {required}")]
    NotEnoughDetections { found: usize, required: usize },
    #[error(
        "only {found} images pass the per-view error threshold, need at least {required} \
         (failing views: {failing:?})"
    )]
    NotEnoughQualityImages {
        found: usize,
        required: usize,
        failing: Vec<usize>,
    },
    #[error(
        "image {} is {width}x{height}, expected {expected_width}x{expected_height}",
        .path.display()
    )]
    ImageSizeMismatch {
        path: PathBuf,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("{resource} not found: {}", .path.display())]
    MissingResource { resource: Resource, path: PathBuf },
    #[error("{resource} at {} is invalid: {source}", .path.display())]
    InvalidResource {
        resource: Resource,
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("intrinsics solver failed")]
    Solver(#[source] BoxError),
    #[error("failed to write calibration output")]
    Persist(#[source] BoxError),
}

impl CalibrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CalibrationError::NotEnoughImages { .. }
            | CalibrationError::NotEnoughDetections { .. }
            | CalibrationError::ImageSizeMismatch { .. }
            | CalibrationError::MissingResource { .. }
            | CalibrationError::InvalidResource { .. } => FailureKind::Precondition,
            CalibrationError::NotEnoughQualityImages { .. }
            | CalibrationError::Solver(_)
            | CalibrationError::Persist(_) => FailureKind::Computation,
        }
    }
}
