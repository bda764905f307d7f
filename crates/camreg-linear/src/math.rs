//! Shared numerics for the linear solvers.
//!
//! Hartley normalization conditions DLT design matrices by centering the
//! points and scaling them to a mean distance of `√2` (2D) or `√3` (3D).
//!
//! ```
//! use camreg_linear::math::normalize_points_2d;
//! use camreg_core::Pt2;
//!
//! let points = vec![
//!     Pt2::new(100.0, 200.0),
//!     Pt2::new(150.0, 250.0),
//!     Pt2::new(120.0, 220.0),
//! ];
//! let (normalized, _t) = normalize_points_2d(&points).unwrap();
//! assert_eq!(normalized.len(), 3);
//! ```

use camreg_core::{Mat3, Pt2, Pt3, Real};
use nalgebra::{DMatrix, Matrix3x4, Matrix4};

/// Hartley normalization for 2D points.
///
/// Returns the normalized points and `T` with `p_norm = T * p_h`, or `None`
/// when the input is empty or all points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as Real;
    let centroid = points.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (2.0 as Real).sqrt() / mean_dist;
    let (cx, cy) = (centroid.x, centroid.y);
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );
    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();
    Some((norm, t))
}

/// Hartley normalization for 3D points; the 3D analog of
/// [`normalize_points_2d`].
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Matrix4<Real>)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as Real;
    let centroid = points.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (3.0 as Real).sqrt() / mean_dist;
    let mut t = Matrix4::<Real>::identity() * scale;
    t[(3, 3)] = 1.0;
    t[(0, 3)] = -scale * centroid.x;
    t[(1, 3)] = -scale * centroid.y;
    t[(2, 3)] = -scale * centroid.z;

    let norm = points
        .iter()
        .map(|p| Pt3::from((p.coords - centroid) * scale))
        .collect();
    Some((norm, t))
}

/// Right singular vector of the smallest singular value of `a`.
///
/// Matrices with fewer rows than columns are padded with zero rows so the
/// full null space is available from the decomposition.
pub(crate) fn null_vector(a: DMatrix<Real>) -> Option<Vec<Real>> {
    let cols = a.ncols();
    let a = if a.nrows() < cols {
        a.resize_vertically(cols, 0.0)
    } else {
        a
    };
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    Some(v_t.row(min_idx).iter().copied().collect())
}

/// Reshape 9 row-major values into a 3×3 matrix.
pub(crate) fn mat3_from_row_major(values: &[Real]) -> Option<Mat3> {
    (values.len() == 9).then(|| Mat3::from_row_slice(values))
}

/// Reshape 12 row-major values into a 3×4 matrix.
pub(crate) fn mat34_from_row_major(values: &[Real]) -> Option<Matrix3x4<Real>> {
    (values.len() == 12).then(|| Matrix3x4::from_row_slice(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_2d_centering() {
        let points = vec![
            Pt2::new(100.0, 200.0),
            Pt2::new(200.0, 300.0),
            Pt2::new(150.0, 250.0),
        ];
        let (norm, t) = normalize_points_2d(&points).unwrap();

        let cx: f64 = norm.iter().map(|p| p.x).sum::<f64>() / norm.len() as f64;
        let cy: f64 = norm.iter().map(|p| p.y).sum::<f64>() / norm.len() as f64;
        assert!(cx.abs() < 1e-10 && cy.abs() < 1e-10);

        let mean_dist: f64 =
            norm.iter().map(|p| p.coords.norm()).sum::<f64>() / norm.len() as f64;
        assert!((mean_dist - 2.0_f64.sqrt()).abs() < 1e-10);

        let mapped = t * nalgebra::Vector3::new(points[0].x, points[0].y, 1.0);
        assert!((mapped.x - norm[0].x).abs() < 1e-12);
    }

    #[test]
    fn normalize_3d_centering() {
        let points = vec![
            Pt3::new(1.0, 2.0, 3.0),
            Pt3::new(4.0, 5.0, 6.0),
            Pt3::new(7.0, 8.0, 9.0),
        ];
        let (norm, t) = normalize_points_3d(&points).unwrap();
        let c = norm.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        assert!(c.norm() < 1e-10);

        let mean_dist: f64 =
            norm.iter().map(|p| p.coords.norm()).sum::<f64>() / norm.len() as f64;
        assert!((mean_dist - 3.0_f64.sqrt()).abs() < 1e-10);

        let mapped = t * points[2].to_homogeneous();
        assert!((mapped.xyz() - norm[2].coords).norm() < 1e-12);
    }

    #[test]
    fn coincident_points_cannot_be_normalized() {
        assert!(normalize_points_2d(&[Pt2::new(1.0, 1.0); 3]).is_none());
        assert!(normalize_points_3d(&[]).is_none());
    }

    #[test]
    fn null_vector_of_wide_matrix() {
        // x + y + z = 0 and x - y = 0 leave (1, 1, -2) as the null direction.
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 1.0, 1.0, -1.0, 0.0]);
        let v = null_vector(a).unwrap();
        let expected = nalgebra::Vector3::new(1.0, 1.0, -2.0).normalize();
        let got = nalgebra::Vector3::new(v[0], v[1], v[2]);
        assert!((got.dot(&expected).abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn row_major_reshape() {
        let vals: Vec<f64> = (1..=9).map(f64::from).collect();
        let m = mat3_from_row_major(&vals).unwrap();
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(2, 0)], 7.0);
        assert!(mat3_from_row_major(&vals[..8]).is_none());

        let vals: Vec<f64> = (1..=12).map(f64::from).collect();
        let m = mat34_from_row_major(&vals).unwrap();
        assert_eq!(m[(0, 3)], 4.0);
        assert_eq!(m[(1, 0)], 5.0);
    }
}
