use nalgebra::{Matrix3, RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Affine map between the normalized image plane and pixels.
pub trait IntrinsicsModel<S: RealField + Copy> {
    fn to_pixel(&self, n: &Vector2<S>) -> Vector2<S>;
    fn from_pixel(&self, px: &Vector2<S>) -> Vector2<S>;
}

/// Upper-triangular K: focal lengths, principal point and skew, all in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    pub fx: S,
    pub fy: S,
    pub cx: S,
    pub cy: S,
    /// Zero for every calibration file this crate reads.
    pub skew: S,
}

impl<S: RealField + Copy> FxFyCxCySkew<S> {
    pub fn k_matrix(&self) -> Matrix3<S> {
        let (z, o) = (S::zero(), S::one());
        Matrix3::from_row_slice(&[
            self.fx, self.skew, self.cx, //
            z, self.fy, self.cy, //
            z, z, o,
        ])
    }
}

impl<S: RealField + Copy> IntrinsicsModel<S> for FxFyCxCySkew<S> {
    fn to_pixel(&self, n: &Vector2<S>) -> Vector2<S> {
        Vector2::new(
            self.fx * n.x + self.skew * n.y + self.cx,
            self.fy * n.y + self.cy,
        )
    }

    /// Inverse of [`Self::to_pixel`]; solves the y row first because x
    /// depends on it through the skew.
    fn from_pixel(&self, px: &Vector2<S>) -> Vector2<S> {
        let y = (px.y - self.cy) / self.fy;
        Vector2::new((px.x - self.cx - self.skew * y) / self.fx, y)
    }
}
