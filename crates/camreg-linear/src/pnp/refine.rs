//! Damped Gauss-Newton (Levenberg-Marquardt) pose refinement.
//!
//! Minimizes pixel reprojection error through the full distorted camera over
//! the six pose parameters `[rvec, t]`. The Jacobian is taken by central
//! differences; rotation updates are additive in rotation-vector space.

use camreg_core::{CameraIntrinsics, PnpError, Pose, Pt2, Pt3, RationalCamera, Real, Vec3};
use nalgebra::{DVector, Matrix6, Vector6};

use super::PnpOptions;

const JACOBIAN_STEP: Real = 1e-7;
const MAX_DAMPING: Real = 1e12;
const MIN_DAMPING: Real = 1e-12;

/// Refinement outcome before summarising into a `PnpSolution`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Refined {
    pub pose: Pose,
    pub cost: Real,
    pub iterations: usize,
    pub converged: bool,
}

struct Problem<'a> {
    camera: RationalCamera,
    points_3d: &'a [Pt3],
    points_2d: &'a [Pt2],
}

impl Problem<'_> {
    /// Stacked `[du0, dv0, du1, ...]` residuals; `None` when a point falls
    /// behind the camera.
    fn residuals(&self, x: &Vector6<Real>) -> Option<DVector<Real>> {
        let pose = to_pose(x);
        let rot = pose.rotation_matrix();
        let mut r = DVector::zeros(2 * self.points_3d.len());
        for (i, (pw, obs)) in self.points_3d.iter().zip(self.points_2d).enumerate() {
            let pc = rot * pw.coords + pose.translation;
            let uv = self.camera.project_point_c(&pc)?;
            r[2 * i] = uv.x - obs.x;
            r[2 * i + 1] = uv.y - obs.y;
        }
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self, x: &Vector6<Real>) -> Option<nalgebra::DMatrix<Real>> {
        let m = 2 * self.points_3d.len();
        let mut jac = nalgebra::DMatrix::zeros(m, 6);
        for k in 0..6 {
            let h = JACOBIAN_STEP * x[k].abs().max(1.0);
            let mut xp = *x;
            let mut xm = *x;
            xp[k] += h;
            xm[k] -= h;
            let rp = self.residuals(&xp)?;
            let rm = self.residuals(&xm)?;
            jac.set_column(k, &((rp - rm) / (2.0 * h)));
        }
        Some(jac)
    }
}

fn to_params(pose: &Pose) -> Vector6<Real> {
    let (r, t) = (pose.rotation, pose.translation);
    Vector6::new(r.x, r.y, r.z, t.x, t.y, t.z)
}

fn to_pose(x: &Vector6<Real>) -> Pose {
    Pose::new(Vec3::new(x[0], x[1], x[2]), Vec3::new(x[3], x[4], x[5]))
}

/// Refine `initial` against distorted pixel observations.
pub(crate) fn refine_pose(
    points_3d: &[Pt3],
    points_2d: &[Pt2],
    intrinsics: &CameraIntrinsics,
    initial: &Pose,
    opts: &PnpOptions,
) -> Result<Refined, PnpError> {
    let problem = Problem {
        camera: intrinsics.camera(),
        points_3d,
        points_2d,
    };

    let mut x = to_params(initial);
    let mut cost = match problem.residuals(&x) {
        Some(r) => r.norm_squared(),
        None => Real::INFINITY,
    };
    if !cost.is_finite() {
        return Ok(Refined {
            pose: *initial,
            cost,
            iterations: 0,
            converged: false,
        });
    }

    let mut damping = opts.initial_damping.max(MIN_DAMPING);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iters {
        iterations += 1;
        if cost <= opts.cost_tolerance {
            converged = true;
            break;
        }

        let (Some(r), Some(jac)) = (problem.residuals(&x), problem.jacobian(&x)) else {
            break;
        };
        let jt = jac.transpose();
        let jtj: Matrix6<Real> = (&jt * &jac).fixed_view::<6, 6>(0, 0).into_owned();
        let g: Vector6<Real> = (&jt * &r).fixed_rows::<6>(0).into_owned();

        let mut accepted = None;
        while damping <= MAX_DAMPING {
            let mut a = jtj;
            for d in 0..6 {
                a[(d, d)] += damping * jtj[(d, d)].max(1e-12);
            }
            let Some(delta) = a.cholesky().map(|c| c.solve(&(-g))) else {
                damping *= 10.0;
                continue;
            };
            let x_new = x + delta;
            match problem.residuals(&x_new).map(|r| r.norm_squared()) {
                Some(new_cost) if new_cost < cost => {
                    accepted = Some((delta, x_new, new_cost));
                    damping = (damping * 0.3).max(MIN_DAMPING);
                    break;
                }
                _ => damping *= 10.0,
            }
        }

        let Some((delta, x_new, new_cost)) = accepted else {
            // No descent direction left: stationary point.
            converged = true;
            break;
        };

        let step_small = delta.norm() <= opts.step_tolerance * (x.norm() + opts.step_tolerance);
        let cost_small = (cost - new_cost) <= opts.cost_tolerance * cost.max(Real::MIN_POSITIVE);
        x = x_new;
        cost = new_cost;
        if step_small || cost_small {
            converged = true;
            break;
        }
    }

    let pose = to_pose(&x);
    if !pose.is_finite() {
        return Err(PnpError::NonFinite);
    }
    Ok(Refined {
        pose,
        cost,
        iterations,
        converged,
    })
}
