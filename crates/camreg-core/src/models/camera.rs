use nalgebra::{Point3, RealField, Vector2, Vector3};

use super::{DistortionModel, IntrinsicsModel, ProjectionModel};

/// Composable camera: `pixel = k(dist(proj(dir)))`.
#[derive(Clone, Debug)]
pub struct Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub proj: P,
    pub dist: D,
    pub k: K,
    _phantom: core::marker::PhantomData<S>,
}

impl<S, P, D, K> Camera<S, P, D, K>
where
    S: RealField + Copy,
    P: ProjectionModel<S>,
    D: DistortionModel<S>,
    K: IntrinsicsModel<S>,
{
    pub fn new(proj: P, dist: D, k: K) -> Self {
        Self {
            proj,
            dist,
            k,
            _phantom: core::marker::PhantomData,
        }
    }

    /// `None` when the projection model rejects the point.
    pub fn project_point_c(&self, p_c: &Vector3<S>) -> Option<Vector2<S>> {
        let n_u = self.proj.project_dir(p_c)?;
        Some(self.k.to_pixel(&self.dist.distort(&n_u)))
    }

    pub fn project_point(&self, p_c: &Point3<S>) -> Option<Vector2<S>> {
        self.project_point_c(&p_c.coords)
    }

    /// Undistorted normalized coordinates of a distorted pixel.
    pub fn normalize_pixel(&self, px: &Vector2<S>) -> Vector2<S> {
        let n_d = self.k.from_pixel(px);
        self.dist.undistort(&n_d)
    }

}
