use camreg_core::{Mat3, Pose, Real};

use crate::HomographyError;

/// Pose of a planar board (z = 0) from its plane-to-image homography.
///
/// `H ~ K [r1 r2 t]`. The scale is fixed from the mean norm of the first two
/// columns of `K⁻¹ H` and its sign is chosen so the board lies in front of the
/// camera. The rotation is projected onto SO(3) with an SVD.
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Pose, HomographyError> {
    let k_inv = kmtx.try_inverse().ok_or(HomographyError::Degenerate)?;
    let m = k_inv * hmtx;

    let h1 = m.column(0).into_owned();
    let h2 = m.column(1).into_owned();
    let h3 = m.column(2).into_owned();

    let mean_norm = (h1.norm() + h2.norm()) * 0.5;
    if mean_norm <= Real::EPSILON {
        return Err(HomographyError::Degenerate);
    }
    let mut lambda = 1.0 / mean_norm;
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);
    let r_approx = Mat3::from_columns(&[r1, r2, r3]);

    let svd = r_approx.svd(true, true);
    let u = svd.u.ok_or(HomographyError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let pose = Pose::from_parts(&r_orth, h3 * lambda);
    if !pose.is_finite() {
        return Err(HomographyError::Degenerate);
    }
    Ok(pose)
}
