//! Direct Linear Transform for non-planar PnP.
//!
//! Works on undistorted normalized image coordinates, so the recovered
//! `P = [R | t]` needs no intrinsics. The rotation block is projected onto
//! SO(3) with an SVD.

use camreg_core::{Pose, Pt2, Pt3, Real};
use nalgebra::DMatrix;

use crate::math::{mat34_from_row_major, normalize_points_3d, null_vector};
use camreg_core::PnpError;

/// Minimum number of correspondences for the 12-unknown DLT.
pub const DLT_MIN_POINTS: usize = 6;

/// Linear PnP from board points and normalized image points.
pub fn dlt(world: &[Pt3], normalized: &[Pt2]) -> Result<Pose, PnpError> {
    let n = world.len();
    if normalized.len() != n {
        return Err(PnpError::CountMismatch {
            points_3d: n,
            points_2d: normalized.len(),
        });
    }
    if n < DLT_MIN_POINTS {
        return Err(PnpError::NotEnoughPoints {
            got: n,
            required: DLT_MIN_POINTS,
        });
    }

    let (world_n, t_world) = normalize_points_3d(world).ok_or(PnpError::Degenerate)?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 12);
    for (i, (pw, pi)) in world_n.iter().zip(normalized.iter()).enumerate() {
        let (x, y, z) = (pw.x, pw.y, pw.z);
        let (u, v) = (pi.x, pi.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    let p = null_vector(a).ok_or(PnpError::Degenerate)?;
    let p_norm = mat34_from_row_major(&p).ok_or(PnpError::Degenerate)?;
    let p_mtx = p_norm * t_world;

    let mut r_approx = p_mtx.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (r_approx.row(0).norm() + r_approx.row(1).norm() + r_approx.row(2).norm()) / 3.0;
    if s <= Real::EPSILON {
        return Err(PnpError::Degenerate);
    }
    if r_approx.determinant() < 0.0 {
        s = -s;
    }
    r_approx /= s;

    let svd = r_approx.svd(true, true);
    let u = svd.u.ok_or(PnpError::Degenerate)?;
    let v_t = svd.v_t.ok_or(PnpError::Degenerate)?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let t = p_mtx.column(3).into_owned() / s;
    let pose = Pose::from_parts(&r_orth, t);
    if !pose.is_finite() {
        return Err(PnpError::NonFinite);
    }
    Ok(pose)
}
