use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Camera, FxFyCxCySkew, Pinhole, RationalDistortion};
use crate::{Mat3, Real};

/// Concrete pinhole camera with rational distortion.
pub type RationalCamera = Camera<Real, Pinhole, RationalDistortion<Real>, FxFyCxCySkew<Real>>;

/// Errors raised while validating camera intrinsics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntrinsicsError {
    #[error("camera matrix is not of the form [fx s cx; 0 fy cy; 0 0 1]")]
    MalformedMatrix,
    #[error("focal lengths must be positive (fx={fx}, fy={fy})")]
    NonPositiveFocal { fx: Real, fy: Real },
    #[error("intrinsics contain non-finite values")]
    NonFinite,
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImageSize { width: u32, height: u32 },
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Intrinsic calibration of one camera: K, distortion and sensor size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub k: FxFyCxCySkew<Real>,
    pub distortion: RationalDistortion<Real>,
    pub image_size: ImageSize,
}

impl CameraIntrinsics {
    /// Validate and assemble intrinsics.
    pub fn new(
        k: FxFyCxCySkew<Real>,
        distortion: RationalDistortion<Real>,
        image_size: ImageSize,
    ) -> Result<Self, IntrinsicsError> {
        let finite = [k.fx, k.fy, k.cx, k.cy, k.skew]
            .iter()
            .all(|v| v.is_finite())
            && distortion.is_finite();
        if !finite {
            return Err(IntrinsicsError::NonFinite);
        }
        if k.fx <= 0.0 || k.fy <= 0.0 {
            return Err(IntrinsicsError::NonPositiveFocal { fx: k.fx, fy: k.fy });
        }
        if image_size.width == 0 || image_size.height == 0 {
            return Err(IntrinsicsError::EmptyImageSize {
                width: image_size.width,
                height: image_size.height,
            });
        }
        Ok(Self {
            k,
            distortion,
            image_size,
        })
    }

    /// Build from a 3×3 camera matrix and an OpenCV-ordered coefficient slice.
    ///
    /// The matrix is normalised so that `K[2, 2] == 1` and checked against
    /// the upper-triangular pinhole form.
    pub fn from_k_matrix(
        kmtx: &Mat3,
        dist: &[Real],
        image_size: ImageSize,
    ) -> Result<Self, IntrinsicsError> {
        let eps = 1e-9;
        let k33 = kmtx[(2, 2)];
        if !k33.is_finite() || k33.abs() < eps {
            return Err(IntrinsicsError::MalformedMatrix);
        }
        let k_norm = *kmtx / k33;
        if k_norm[(1, 0)].abs() > eps || k_norm[(2, 0)].abs() > eps || k_norm[(2, 1)].abs() > eps
        {
            return Err(IntrinsicsError::MalformedMatrix);
        }

        let k = FxFyCxCySkew {
            fx: k_norm[(0, 0)],
            skew: k_norm[(0, 1)],
            cx: k_norm[(0, 2)],
            fy: k_norm[(1, 1)],
            cy: k_norm[(1, 2)],
        };
        Self::new(k, RationalDistortion::from_coefficients(dist), image_size)
    }

    pub fn k_matrix(&self) -> Mat3 {
        self.k.k_matrix()
    }

    /// Composable camera model for projection/unprojection.
    pub fn camera(&self) -> RationalCamera {
        Camera::new(Pinhole, self.distortion, self.k)
    }

    /// Principal point and focal length divided by the image dimensions:
    /// `[cx / w, cy / h, fx / w, fy / h]`.
    pub fn normalized_pinhole(&self) -> [Real; 4] {
        let w = self.image_size.width as Real;
        let h = self.image_size.height as Real;
        [self.k.cx / w, self.k.cy / h, self.k.fx / w, self.k.fy / h]
    }
}
