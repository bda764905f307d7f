use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Default fixed-point iteration budget used by [`DistortionModel::undistort`].
pub const DEFAULT_UNDISTORT_ITERS: u32 = 400;

pub trait DistortionModel<S: RealField + Copy> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S>;
    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S>;
}

/// Eight-coefficient rational Brown–Conrady model.
///
/// Coefficients follow OpenCV's `CALIB_RATIONAL_MODEL` order
/// `k1 k2 p1 p2 k3 k4 k5 k6`:
///
/// ```text
/// radial = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
/// x_d = x radial + 2 p1 x y + p2 (r² + 2 x²)
/// y_d = y radial + p1 (r² + 2 y²) + 2 p2 x y
/// ```
///
/// With `k4 = k5 = k6 = 0` this reduces to the classic 5-parameter model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RationalDistortion<S: RealField + Copy> {
    pub k1: S,
    pub k2: S,
    pub p1: S,
    pub p2: S,
    pub k3: S,
    pub k4: S,
    pub k5: S,
    pub k6: S,
}

impl RationalDistortion<f64> {
    /// Number of coefficients carried by the model.
    pub const LEN: usize = 8;

    /// Build from an OpenCV-ordered coefficient slice.
    ///
    /// Extra coefficients (thin-prism, tilt) are dropped; missing ones are zero.
    pub fn from_coefficients(coeffs: &[f64]) -> Self {
        let mut c = [0.0; Self::LEN];
        for (dst, src) in c.iter_mut().zip(coeffs) {
            *dst = *src;
        }
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
            k4: c[5],
            k5: c[6],
            k6: c[7],
        }
    }

    /// Coefficients in OpenCV order.
    pub fn coefficients(&self) -> [f64; Self::LEN] {
        [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.coefficients().iter().all(|c| c.is_finite())
    }
}

impl<S: RealField + Copy> RationalDistortion<S> {
    fn radial(&self, r2: S) -> S {
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let num = S::one() + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;
        let den = S::one() + self.k4 * r2 + self.k5 * r4 + self.k6 * r6;
        num / den
    }

    fn tangential(&self, x: S, y: S, r2: S) -> (S, S) {
        let two = S::one() + S::one();
        let xy = x * y;
        let x_tan = two * self.p1 * xy + self.p2 * (r2 + two * x * x);
        let y_tan = self.p1 * (r2 + two * y * y) + two * self.p2 * xy;
        (x_tan, y_tan)
    }

    /// Iterative undistortion with an explicit budget.
    ///
    /// Fixed-point iteration `x ← (x_d − Δ(x)) / radial(x)` starting from the
    /// distorted coordinates; stops once the update falls below `tol`.
    pub fn undistort_with(&self, n_dist: &Vector2<S>, max_iters: u32, tol: S) -> Vector2<S> {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        for _ in 0..max_iters.max(1) {
            let r2 = x * x + y * y;
            let radial = self.radial(r2);
            if radial <= S::zero() {
                // Outside the model's monotonic region.
                return *n_dist;
            }
            let (x_tan, y_tan) = self.tangential(x, y, r2);
            let x_new = (n_dist.x - x_tan) / radial;
            let y_new = (n_dist.y - y_tan) / radial;

            let dx = (x_new - x).abs();
            let dy = (y_new - y).abs();
            x = x_new;
            y = y_new;
            if dx.max(dy) <= tol {
                break;
            }
        }
        Vector2::new(x, y)
    }
}

impl<S: RealField + Copy> DistortionModel<S> for RationalDistortion<S> {
    fn distort(&self, n_undist: &Vector2<S>) -> Vector2<S> {
        let x = n_undist.x;
        let y = n_undist.y;
        let r2 = x * x + y * y;
        let radial = self.radial(r2);
        let (x_tan, y_tan) = self.tangential(x, y, r2);
        Vector2::new(x * radial + x_tan, y * radial + y_tan)
    }

    fn undistort(&self, n_dist: &Vector2<S>) -> Vector2<S> {
        self.undistort_with(n_dist, DEFAULT_UNDISTORT_ITERS, S::zero())
    }
}
