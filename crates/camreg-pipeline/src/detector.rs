//! Marker detection seam.
//!
//! Detection on raw pixels is provided by external detectors through
//! [`MarkerDetector`]. [`SidecarDetector`] reads detections that were exported
//! next to each image.

use std::path::{Path, PathBuf};

use camreg_core::{BoardError, BoardTemplate, ImageSize, MarkerDetections, Pt2};
use image::GrayImage;
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Grayscale image plus the file it was decoded from.
#[derive(Debug, Clone)]
pub struct BoardImage {
    pub path: Option<PathBuf>,
    pub pixels: GrayImage,
}

impl BoardImage {
    pub fn new(pixels: GrayImage) -> Self {
        Self { path: None, pixels }
    }

    pub fn with_path(pixels: GrayImage, path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            pixels,
        }
    }

    /// Decode an image file to 8-bit luma.
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let pixels = image::ImageReader::open(path)?.decode()?.to_luma8();
        Ok(Self::with_path(pixels, path))
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.pixels.width(), self.pixels.height())
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("image has no source path to locate detections")]
    NoSourcePath,
    #[error("failed to read detections {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse detections {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("detections {} are inconsistent", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: BoardError,
    },
}

/// Finds board corners and their ids in one image.
///
/// "Nothing found" is an empty [`MarkerDetections`], not an error.
pub trait MarkerDetector: Send + Sync {
    fn detect(
        &self,
        image: &BoardImage,
        board: &BoardTemplate,
    ) -> Result<MarkerDetections, DetectorError>;
}

/// On-disk detection record: `{"ids": [..], "corners": [[x, y], ..]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFile {
    pub ids: Vec<u32>,
    pub corners: Vec<[f64; 2]>,
}

impl From<&MarkerDetections> for DetectionFile {
    fn from(det: &MarkerDetections) -> Self {
        Self {
            ids: det.ids.clone(),
            corners: det.corners.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

/// Detections stored beside each image as `<stem>.corners.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarDetector;

impl SidecarDetector {
    pub fn sidecar_path(image_path: &Path) -> PathBuf {
        image_path.with_extension("corners.json")
    }

    /// Write detections for `image_path` in the sidecar format.
    pub fn write(image_path: &Path, detections: &MarkerDetections) -> std::io::Result<PathBuf> {
        let path = Self::sidecar_path(image_path);
        let json = serde_json::to_string_pretty(&DetectionFile::from(detections))
            .map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

impl MarkerDetector for SidecarDetector {
    fn detect(
        &self,
        image: &BoardImage,
        _board: &BoardTemplate,
    ) -> Result<MarkerDetections, DetectorError> {
        let image_path = image.path.as_deref().ok_or(DetectorError::NoSourcePath)?;
        let path = Self::sidecar_path(image_path);
        if !path.exists() {
            warn!("no detections found for {}", image_path.display());
            return Ok(MarkerDetections::empty());
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| DetectorError::Io {
            path: path.clone(),
            source,
        })?;
        let file: DetectionFile =
            serde_json::from_str(&contents).map_err(|source| DetectorError::Parse {
                path: path.clone(),
                source,
            })?;
        let corners = file.corners.iter().map(|c| Pt2::new(c[0], c[1])).collect();
        MarkerDetections::new(corners, file.ids)
            .map_err(|source| DetectorError::Invalid { path, source })
    }
}
