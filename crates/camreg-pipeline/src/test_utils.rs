//! Detector and solver doubles for tests and demos.
//!
//! [`SyntheticDetector`] keys its answers on the luma value of pixel (0, 0),
//! so a test can build tagged images without rendering a board.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use camreg_core::{
    BoardTemplate, CameraIntrinsics, CorrespondenceView, ImageSize, MarkerDetections, Pose, Real,
};
use image::{GrayImage, Luma};

use crate::calibration::{IntrinsicsSolution, IntrinsicsSolver};
use crate::detector::{BoardImage, DetectorError, MarkerDetector};
use crate::error::BoxError;

/// Returns preset detections per image tag; unknown tags detect nothing.
#[derive(Debug, Clone, Default)]
pub struct SyntheticDetector {
    by_tag: HashMap<u8, MarkerDetections>,
}

impl SyntheticDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: u8, detections: MarkerDetections) -> Self {
        self.by_tag.insert(tag, detections);
        self
    }

    pub fn tagged_pixels(tag: u8, width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([tag]))
    }

    /// In-memory image carrying `tag`.
    pub fn image(tag: u8, width: u32, height: u32) -> BoardImage {
        BoardImage::new(Self::tagged_pixels(tag, width, height))
    }

    /// Write a tagged PNG to `path`.
    pub fn save_image(path: &Path, tag: u8, width: u32, height: u32) -> image::ImageResult<()> {
        Self::tagged_pixels(tag, width, height).save(path)
    }

    fn tag(image: &BoardImage) -> Option<u8> {
        (!image.is_empty()).then(|| image.pixels.get_pixel(0, 0).0[0])
    }
}

impl MarkerDetector for SyntheticDetector {
    fn detect(
        &self,
        image: &BoardImage,
        _board: &BoardTemplate,
    ) -> Result<MarkerDetections, DetectorError> {
        Ok(Self::tag(image)
            .and_then(|t| self.by_tag.get(&t))
            .cloned()
            .unwrap_or_default())
    }
}

/// Wraps a detector and counts calls.
#[derive(Debug, Default)]
pub struct CountingDetector<D> {
    pub inner: D,
    calls: AtomicUsize,
}

impl<D> CountingDetector<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<D: MarkerDetector> MarkerDetector for CountingDetector<D> {
    fn detect(
        &self,
        image: &BoardImage,
        board: &BoardTemplate,
    ) -> Result<MarkerDetections, DetectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.detect(image, board)
    }
}

/// What a [`ScriptedIntrinsicsSolver`] was called with.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverCall {
    pub num_views: usize,
    pub image_size: ImageSize,
    pub initial: Option<CameraIntrinsics>,
}

/// Intrinsics solver returning fixed intrinsics and scripted view errors.
///
/// View `i` gets `per_view_errors[i]`, or `default_error` past the end of the
/// list. The overall RMS is the RMS of the view errors unless overridden.
#[derive(Debug)]
pub struct ScriptedIntrinsicsSolver {
    pub intrinsics: CameraIntrinsics,
    pub per_view_errors: Vec<Real>,
    pub default_error: Real,
    pub overall_rms: Option<Real>,
    pub fail_with: Option<String>,
    calls: Mutex<Vec<SolverCall>>,
}

impl ScriptedIntrinsicsSolver {
    pub fn new(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            per_view_errors: Vec::new(),
            default_error: 0.1,
            overall_rms: None,
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_view_errors(mut self, errors: Vec<Real>) -> Self {
        self.per_view_errors = errors;
        self
    }

    pub fn with_overall_rms(mut self, rms: Real) -> Self {
        self.overall_rms = Some(rms);
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<SolverCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl IntrinsicsSolver for ScriptedIntrinsicsSolver {
    fn solve(
        &self,
        views: &[CorrespondenceView],
        image_size: ImageSize,
        initial: Option<&CameraIntrinsics>,
    ) -> Result<IntrinsicsSolution, BoxError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SolverCall {
                num_views: views.len(),
                image_size,
                initial: initial.copied(),
            });
        }
        if let Some(msg) = &self.fail_with {
            return Err(msg.clone().into());
        }

        let per_view_errors: Vec<Real> = (0..views.len())
            .map(|i| self.per_view_errors.get(i).copied().unwrap_or(self.default_error))
            .collect();
        let overall_rms = self.overall_rms.unwrap_or_else(|| {
            let n = per_view_errors.len().max(1) as Real;
            (per_view_errors.iter().map(|e| e * e).sum::<Real>() / n).sqrt()
        });
        Ok(IntrinsicsSolution {
            intrinsics: self.intrinsics,
            overall_rms,
            per_view_errors,
            poses: vec![Pose::splat(0.0); views.len()],
        })
    }
}
