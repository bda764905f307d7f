//! Two-camera calibration blob and registration report.
//!
//! Camera A is the origin of the blob. Camera B carries the B → A transform.

use std::path::Path;

use anyhow::Result;
use camreg_core::{CameraIntrinsics, Real, RigidTransform};
use serde::{Deserialize, Serialize};

use crate::io::write_json_file;
use crate::registration::RegistrationResult;

pub const BROWN_CONRADY_MODEL: &str = "CALIBRATION_LensDistortionModelBrownConrady";
pub const MODEL_PARAMETER_COUNT: usize = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobIntrinsics {
    pub model_parameter_count: usize,
    pub model_parameters: Vec<Real>,
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobExtrinsics {
    /// Row-major 3x3.
    pub rotation: Vec<Real>,
    pub translation: Vec<Real>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobCamera {
    pub intrinsics: BlobIntrinsics,
    pub rt: BlobExtrinsics,
    pub sensor_width: u32,
    pub sensor_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalibrationInformation {
    pub cameras: Vec<BlobCamera>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalibrationBlob {
    pub calibration_information: CalibrationInformation,
}

/// Model parameters normalized by the image size:
/// `[cx/w, cy/h, fx/w, fy/h, k1..k6, 0, 0, p2, p1]`.
///
/// The two zeros are the reserved center-of-distortion offsets.
pub fn model_parameters(intrinsics: &CameraIntrinsics) -> [Real; MODEL_PARAMETER_COUNT] {
    let [cx, cy, fx, fy] = intrinsics.normalized_pinhole();
    let d = &intrinsics.distortion;
    [
        cx, cy, fx, fy, d.k1, d.k2, d.k3, d.k4, d.k5, d.k6, 0.0, 0.0, d.p2, d.p1,
    ]
}

impl BlobCamera {
    pub fn new(intrinsics: &CameraIntrinsics, to_origin: &RigidTransform) -> Self {
        Self {
            intrinsics: BlobIntrinsics {
                model_parameter_count: MODEL_PARAMETER_COUNT,
                model_parameters: model_parameters(intrinsics).to_vec(),
                model_type: BROWN_CONRADY_MODEL.to_string(),
            },
            rt: BlobExtrinsics {
                rotation: to_origin.rotation_row_major().to_vec(),
                translation: to_origin.translation_array().to_vec(),
            },
            sensor_width: intrinsics.image_size.width,
            sensor_height: intrinsics.image_size.height,
        }
    }
}

impl CalibrationBlob {
    pub fn new(
        intrinsics_a: &CameraIntrinsics,
        intrinsics_b: &CameraIntrinsics,
        b_to_a: &RigidTransform,
    ) -> Self {
        Self {
            calibration_information: CalibrationInformation {
                cameras: vec![
                    BlobCamera::new(intrinsics_a, &RigidTransform::identity()),
                    BlobCamera::new(intrinsics_b, b_to_a),
                ],
            },
        }
    }
}

/// Per-direction registration errors as written to `report.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationReport {
    #[serde(rename = "RMS_B_to_A_pixels")]
    pub b_to_a_pixels: Real,
    #[serde(rename = "RMS_B_to_A_radians")]
    pub b_to_a_radians: Real,
    #[serde(rename = "RMS_A_to_B_pixels")]
    pub a_to_b_pixels: Real,
    #[serde(rename = "RMS_A_to_B_radians")]
    pub a_to_b_radians: Real,
}

impl From<&RegistrationResult> for RegistrationReport {
    fn from(result: &RegistrationResult) -> Self {
        Self {
            b_to_a_pixels: result.metrics_b_to_a.pixel_rms,
            b_to_a_radians: result.metrics_b_to_a.angular_rms,
            a_to_b_pixels: result.metrics_a_to_b.pixel_rms,
            a_to_b_radians: result.metrics_a_to_b.angular_rms,
        }
    }
}

pub fn write_blob(path: &Path, blob: &CalibrationBlob) -> Result<()> {
    write_json_file(path, blob)
}

pub fn write_registration_report(path: &Path, report: &RegistrationReport) -> Result<()> {
    write_json_file(path, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::RegistrationMetrics;
    use camreg_core::{rotation_from_vector, ImageSize, Mat3, Vec3};

    fn intrinsics() -> CameraIntrinsics {
        let k = Mat3::new(1000.0, 0.0, 500.0, 0.0, 800.0, 400.0, 0.0, 0.0, 1.0);
        CameraIntrinsics::from_k_matrix(
            &k,
            &[0.1, 0.2, 0.01, 0.02, 0.3, 0.4, 0.5, 0.6],
            ImageSize::new(1000, 800),
        )
        .unwrap()
    }

    #[test]
    fn parameters_use_fourteen_slot_layout() {
        let p = model_parameters(&intrinsics());
        assert_eq!(
            p,
            [0.5, 0.5, 1.0, 1.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.0, 0.0, 0.02, 0.01]
        );
    }

    #[test]
    fn blob_places_camera_a_at_origin() {
        let rot = rotation_from_vector(&Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let b_to_a = RigidTransform::new(rot, Vec3::new(0.1, -0.2, 0.3));
        let blob = CalibrationBlob::new(&intrinsics(), &intrinsics(), &b_to_a);
        let json = serde_json::to_value(&blob).unwrap();

        let cams = &json["CalibrationInformation"]["Cameras"];
        assert_eq!(cams.as_array().unwrap().len(), 2);
        assert_eq!(
            cams[0]["Rt"]["Rotation"],
            serde_json::json!([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
        );
        assert_eq!(cams[1]["Rt"]["Translation"], serde_json::json!([0.1, -0.2, 0.3]));
        assert_eq!(cams[1]["Intrinsics"]["ModelParameterCount"], 14);
        assert_eq!(cams[1]["Intrinsics"]["ModelType"], BROWN_CONRADY_MODEL);
        assert_eq!(cams[1]["SensorWidth"], 1000);

        // Row-major: second entry is R[0][1] = -sin(90°).
        let r = cams[1]["Rt"]["Rotation"].as_array().unwrap();
        assert!((r[1].as_f64().unwrap() + 1.0).abs() < 1e-12);
        assert!((r[3].as_f64().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn report_uses_direction_keys() {
        let metrics = |px, rad| RegistrationMetrics {
            pixel_rms: px,
            angular_rms: rad,
            num_points: 4,
        };
        let result = RegistrationResult {
            transform: RigidTransform::identity(),
            metrics_b_to_a: metrics(0.5, 0.0005),
            metrics_a_to_b: metrics(0.25, 0.0003),
        };
        let json = serde_json::to_value(RegistrationReport::from(&result)).unwrap();
        assert_eq!(json["RMS_B_to_A_pixels"], 0.5);
        assert_eq!(json["RMS_A_to_B_radians"], 0.0003);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_registration_report(&path, &RegistrationReport::from(&result)).unwrap();
        let back: RegistrationReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, RegistrationReport::from(&result));
    }
}
