//! Batch intrinsic calibration with quality gating.
//!
//! Images are scanned from a directory, corners are detected in parallel,
//! and the views are handed to an [`IntrinsicsSolver`]. The solve is then
//! judged by the [`QualityGate`]; only accepted calibrations are persisted.

use std::path::{Path, PathBuf};
use std::time::Instant;

use camreg_core::{
    BoardGeometry, BoardTemplate, CameraIntrinsics, CorrespondenceView, ImageSize, Pose, Real,
};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CalibrationConfig;
use crate::detector::{BoardImage, MarkerDetector};
use crate::error::{BoxError, CalibrationError, Resource};
use crate::io;
use crate::quality::{GateDecision, GateRejection, QualityGate};

/// Output of an intrinsics solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicsSolution {
    pub intrinsics: CameraIntrinsics,
    /// Pixels, over all views.
    pub overall_rms: Real,
    /// Pixels, one per input view.
    pub per_view_errors: Vec<Real>,
    /// Board pose per input view.
    pub poses: Vec<Pose>,
}

/// Nonlinear intrinsics estimation over many board views.
pub trait IntrinsicsSolver: Sync {
    fn solve(
        &self,
        views: &[CorrespondenceView],
        image_size: ImageSize,
        initial: Option<&CameraIntrinsics>,
    ) -> Result<IntrinsicsSolution, BoxError>;
}

/// Per-image detection outcome. Failures stay local to their image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImageDetection {
    Detected {
        path: PathBuf,
        size: ImageSize,
        view: CorrespondenceView,
    },
    TooFewCorners {
        path: PathBuf,
        found: usize,
    },
    Unreadable {
        path: PathBuf,
        reason: String,
    },
    DetectorFailed {
        path: PathBuf,
        reason: String,
    },
}

impl ImageDetection {
    pub fn path(&self) -> &Path {
        match self {
            ImageDetection::Detected { path, .. }
            | ImageDetection::TooFewCorners { path, .. }
            | ImageDetection::Unreadable { path, .. }
            | ImageDetection::DetectorFailed { path, .. } => path,
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, ImageDetection::Detected { .. })
    }
}

/// Result of a calibration run that got past all preconditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub intrinsics: CameraIntrinsics,
    pub overall_rms: Real,
    pub accepted: bool,
    /// View indices refer to `view_paths`.
    pub decision: GateDecision,
    pub view_paths: Vec<PathBuf>,
    pub poses: Vec<Pose>,
    pub detections: Vec<ImageDetection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct RmsReport {
    #[serde(rename = "RMS_pixels")]
    rms_pixels: Real,
}

impl CalibrationReport {
    /// Write `calib{postfix}.json` and `report.json` into `dir`.
    ///
    /// Rejected calibrations write nothing and return `Ok(None)`.
    pub fn persist(&self, dir: &Path, postfix: &str) -> Result<Option<PathBuf>, CalibrationError> {
        if !self.accepted {
            info!("calibration rejected, nothing written to {}", dir.display());
            return Ok(None);
        }
        let calib_path = dir.join(format!("calib{postfix}.json"));
        io::write_calibration(&calib_path, &self.intrinsics)
            .map_err(|e| CalibrationError::Persist(e.into()))?;
        let report = RmsReport {
            rms_pixels: self.overall_rms,
        };
        io::write_json_file(&dir.join("report.json"), &report)
            .map_err(|e| CalibrationError::Persist(e.into()))?;
        info!("calibration written to {}", calib_path.display());
        Ok(Some(calib_path))
    }
}

/// Image files in `dir` whose extension is one of `extensions`
/// (case-insensitive), sorted by path.
pub fn list_calibration_images(
    dir: &Path,
    extensions: &[String],
) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn detect_image<D: MarkerDetector>(
    path: &Path,
    board: &BoardTemplate,
    geometry: &BoardGeometry,
    detector: &D,
    min_corners: usize,
) -> ImageDetection {
    let path_buf = path.to_path_buf();
    let image = match BoardImage::open(path) {
        Ok(image) => image,
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            return ImageDetection::Unreadable {
                path: path_buf,
                reason: e.to_string(),
            };
        }
    };

    let detections = match detector.detect(&image, board) {
        Ok(det) => det,
        Err(e) => {
            warn!("detection failed for {}: {e}", path.display());
            return ImageDetection::DetectorFailed {
                path: path_buf,
                reason: e.to_string(),
            };
        }
    };
    if detections.len() < min_corners {
        return ImageDetection::TooFewCorners {
            path: path_buf,
            found: detections.len(),
        };
    }

    match CorrespondenceView::from_detections(geometry, &detections) {
        Ok(view) => ImageDetection::Detected {
            path: path_buf,
            size: image.size(),
            view,
        },
        Err(e) => {
            warn!("detections of {} do not fit the board: {e:#}", path.display());
            ImageDetection::DetectorFailed {
                path: path_buf,
                reason: format!("{e:#}"),
            }
        }
    }
}

/// Calibrate one camera from an explicit image list.
///
/// `initial` optionally names a calibration file used as the starting point.
pub fn calibrate_camera<D, S>(
    images: &[PathBuf],
    board: &BoardTemplate,
    config: &CalibrationConfig,
    detector: &D,
    solver: &S,
    initial: Option<&Path>,
) -> Result<CalibrationReport, CalibrationError>
where
    D: MarkerDetector,
    S: IntrinsicsSolver,
{
    if images.len() < config.min_images {
        return Err(CalibrationError::NotEnoughImages {
            found: images.len(),
            required: config.min_images,
        });
    }

    let geometry = board.geometry();
    let min_corners = config.min_corners.max(camreg_linear::PNP_MIN_POINTS);
    let started = Instant::now();
    let detections: Vec<ImageDetection> = images
        .par_iter()
        .map(|path| detect_image(path, board, &geometry, detector, min_corners))
        .collect();
    info!(
        "detected corners in {} images in {:.2}s",
        images.len(),
        started.elapsed().as_secs_f64()
    );

    let mut views = Vec::new();
    let mut view_paths = Vec::new();
    let mut image_size: Option<ImageSize> = None;
    for outcome in &detections {
        let ImageDetection::Detected { path, size, view } = outcome else {
            continue;
        };
        match image_size {
            None => image_size = Some(*size),
            Some(expected) if expected != *size => {
                return Err(CalibrationError::ImageSizeMismatch {
                    path: path.clone(),
                    width: size.width,
                    height: size.height,
                    expected_width: expected.width,
                    expected_height: expected.height,
                });
            }
            Some(_) => {}
        }
        views.push(view.clone());
        view_paths.push(path.clone());
    }

    let image_size = match image_size {
        Some(size) if views.len() >= config.min_detections => size,
        _ => {
            return Err(CalibrationError::NotEnoughDetections {
                found: views.len(),
                required: config.min_detections,
            })
        }
    };
    info!("{} of {} images have usable detections", views.len(), images.len());

    let initial = match initial {
        Some(path) => Some(load_initial(path)?),
        None => None,
    };

    let started = Instant::now();
    let solution = solver
        .solve(&views, image_size, initial.as_ref())
        .map_err(CalibrationError::Solver)?;
    if solution.per_view_errors.len() != views.len() {
        return Err(CalibrationError::Solver(
            format!(
                "solver returned {} per-view errors for {} views",
                solution.per_view_errors.len(),
                views.len()
            )
            .into(),
        ));
    }
    info!(
        "intrinsics solved in {:.2}s, overall RMS {:.4} px",
        started.elapsed().as_secs_f64(),
        solution.overall_rms
    );

    let gate = QualityGate::new(config.quality_thresholds());
    let decision = gate.evaluate(&solution.per_view_errors, solution.overall_rms);
    if let Some(GateRejection::TooFewGoodImages { found, required }) = decision.rejection {
        return Err(CalibrationError::NotEnoughQualityImages {
            found,
            required,
            failing: decision.failing_indices,
        });
    }
    if let Some(GateRejection::RmsTooHigh { rms, threshold }) = decision.rejection {
        warn!("overall RMS {rms:.4} px is not below {threshold}, calibration rejected");
    }

    Ok(CalibrationReport {
        intrinsics: solution.intrinsics,
        overall_rms: solution.overall_rms,
        accepted: decision.accepted,
        decision,
        view_paths,
        poses: solution.poses,
        detections,
    })
}

/// Calibrate from every matching image in `dir`.
pub fn calibrate_directory<D, S>(
    dir: &Path,
    board: &BoardTemplate,
    config: &CalibrationConfig,
    detector: &D,
    solver: &S,
    initial: Option<&Path>,
) -> Result<CalibrationReport, CalibrationError>
where
    D: MarkerDetector,
    S: IntrinsicsSolver,
{
    if !dir.is_dir() {
        return Err(CalibrationError::MissingResource {
            resource: Resource::ImageDirectory,
            path: dir.to_path_buf(),
        });
    }
    let images = list_calibration_images(dir, &config.extensions).map_err(|e| {
        CalibrationError::InvalidResource {
            resource: Resource::ImageDirectory,
            path: dir.to_path_buf(),
            source: e.into(),
        }
    })?;
    info!("found {} images in {}", images.len(), dir.display());
    calibrate_camera(&images, board, config, detector, solver, initial)
}

fn load_initial(path: &Path) -> Result<CameraIntrinsics, CalibrationError> {
    if !path.exists() {
        return Err(CalibrationError::MissingResource {
            resource: Resource::InitialCalibration,
            path: path.to_path_buf(),
        });
    }
    io::load_calibration(path).map_err(|e| CalibrationError::InvalidResource {
        resource: Resource::InitialCalibration,
        path: path.to_path_buf(),
        source: e.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_matching_images_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.png", "a.JPG", "b.png", "notes.txt", "d.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let exts = CalibrationConfig::default().extensions;
        let found = list_calibration_images(dir.path(), &exts).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.JPG", "b.png", "c.png"]);
    }

    #[test]
    fn rejected_report_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let intrinsics = camreg_core::synthetic::planar::stereo_scene()
            .unwrap()
            .intrinsics_a;
        let report = CalibrationReport {
            intrinsics,
            overall_rms: 2.0,
            accepted: false,
            decision: QualityGate::new(CalibrationConfig::default().quality_thresholds())
                .evaluate(&[], 2.0),
            view_paths: Vec::new(),
            poses: Vec::new(),
            detections: Vec::new(),
        };
        assert_eq!(report.persist(dir.path(), "").unwrap(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let accepted = CalibrationReport {
            accepted: true,
            overall_rms: 0.25,
            ..report
        };
        let path = accepted.persist(dir.path(), "_left").unwrap().unwrap();
        assert!(path.ends_with("calib_left.json"));
        let rms: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(rms["RMS_pixels"], 0.25);
        assert_eq!(io::load_calibration(&path).unwrap(), intrinsics);
    }

    #[test]
    fn missing_initial_calibration_is_a_precondition() {
        let err = load_initial(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::MissingResource {
                resource: Resource::InitialCalibration,
                ..
            }
        ));
    }
}
