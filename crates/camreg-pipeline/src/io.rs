//! Calibration and board template files.

use std::path::Path;

use anyhow::{Context, Result};
use camreg_core::{BoardTemplate, CameraIntrinsics, ImageSize, Mat3, Real};
use serde::{Deserialize, Serialize};

/// Serialized camera calibration.
///
/// `{"K": [[fx, s, cx], [0, fy, cy], [0, 0, 1]], "dist": [...], "img_size": [w, h]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFile {
    #[serde(rename = "K")]
    pub k: [[Real; 3]; 3],
    pub dist: Vec<Real>,
    pub img_size: [u32; 2],
}

impl CalibrationFile {
    pub fn to_intrinsics(&self) -> Result<CameraIntrinsics> {
        let k = &self.k;
        let kmtx = Mat3::new(
            k[0][0], k[0][1], k[0][2], k[1][0], k[1][1], k[1][2], k[2][0], k[2][1], k[2][2],
        );
        let size = ImageSize::new(self.img_size[0], self.img_size[1]);
        Ok(CameraIntrinsics::from_k_matrix(&kmtx, &self.dist, size)?)
    }
}

impl From<&CameraIntrinsics> for CalibrationFile {
    /// The distortion vector is written with its 8 rational coefficients.
    fn from(intr: &CameraIntrinsics) -> Self {
        let m = intr.k_matrix();
        Self {
            k: [
                [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
                [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
                [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
            ],
            dist: intr.distortion.coefficients().to_vec(),
            img_size: [intr.image_size.width, intr.image_size.height],
        }
    }
}

/// One board entry of a template file; lengths in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateShape {
    pub squares_x: u32,
    pub squares_y: u32,
    pub square_length: Real,
    pub marker_length: Real,
    pub aruco_dict_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFile {
    pub shapes: Vec<TemplateShape>,
}

impl TemplateFile {
    /// The first shape as a metric board template.
    pub fn board(&self) -> Result<BoardTemplate> {
        let shape = self
            .shapes
            .first()
            .context("template file lists no shapes")?;
        Ok(BoardTemplate::from_millimeters(
            shape.squares_x,
            shape.squares_y,
            shape.square_length,
            shape.marker_length,
            shape.aruco_dict_name.clone(),
        )?)
    }
}

impl From<&BoardTemplate> for TemplateFile {
    fn from(board: &BoardTemplate) -> Self {
        Self {
            shapes: vec![TemplateShape {
                squares_x: board.squares_x,
                squares_y: board.squares_y,
                square_length: board.square_length * 1000.0,
                marker_length: board.marker_length * 1000.0,
                aruco_dict_name: board.dictionary.clone(),
            }],
        }
    }
}

pub fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

pub fn load_calibration(path: &Path) -> Result<CameraIntrinsics> {
    load_json_file::<CalibrationFile>(path)?
        .to_intrinsics()
        .with_context(|| format!("invalid calibration in {}", path.display()))
}

pub fn write_calibration(path: &Path, intrinsics: &CameraIntrinsics) -> Result<()> {
    write_json_file(path, &CalibrationFile::from(intrinsics))
}

pub fn load_template(path: &Path) -> Result<BoardTemplate> {
    load_json_file::<TemplateFile>(path)?
        .board()
        .with_context(|| format!("invalid board template in {}", path.display()))
}

pub fn write_template(path: &Path, board: &BoardTemplate) -> Result<()> {
    write_json_file(path, &TemplateFile::from(board))
}
