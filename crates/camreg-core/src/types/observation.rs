//! 2D-3D correspondences.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::{BoardGeometry, MarkerDetections};
use crate::{Pt2, Pt3, Real};

/// 2D-3D point correspondences of one image.
///
/// ```
/// use camreg_core::{CorrespondenceView, Pt2, Pt3};
///
/// let board = vec![Pt3::new(0.03, 0.03, 0.0), Pt3::new(0.06, 0.03, 0.0)];
/// let pixels = vec![Pt2::new(612.5, 344.0), Pt2::new(655.0, 345.5)];
/// let view = CorrespondenceView::new(board, pixels).unwrap();
/// assert!(view.is_planar(1e-12));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrespondenceView {
    /// Board-frame points.
    pub points_3d: Vec<Pt3>,
    /// Matching pixel observations.
    pub points_2d: Vec<Pt2>,
}

impl CorrespondenceView {
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "{} board points but {} image points",
            points_3d.len(),
            points_2d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    /// Pair detected corners with their board positions.
    pub fn from_detections(
        geometry: &BoardGeometry,
        detections: &MarkerDetections,
    ) -> Result<Self> {
        let points_3d = geometry.points_for(&detections.ids)?;
        Self::new(points_3d, detections.corners.clone())
    }

    /// Board points projected onto the z = 0 plane.
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.points_3d.iter().map(|p| Pt2::new(p.x, p.y)).collect()
    }

    /// True when every board point has `|z| <= tol`.
    pub fn is_planar(&self, tol: Real) -> bool {
        self.points_3d.iter().all(|p| p.z.abs() <= tol)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pt3, &Pt2)> {
        self.points_3d.iter().zip(self.points_2d.iter())
    }
}
