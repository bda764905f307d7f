//! Central projection onto the normalized image plane `z = 1`.

use nalgebra::{RealField, Vector2, Vector3};
use serde::{Deserialize, Serialize};

pub trait ProjectionModel<S: RealField + Copy> {
    /// `None` for directions that never reach the image plane.
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>>;
    /// Direction through a normalized point, scaled so that `z = 1`.
    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S>;
}

/// Ideal pinhole; directions with `z <= 0` are rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pinhole;

impl Pinhole {
    pub fn in_front<S: RealField + Copy>(dir_c: &Vector3<S>) -> bool {
        dir_c.z > S::zero()
    }
}

impl<S: RealField + Copy> ProjectionModel<S> for Pinhole {
    fn project_dir(&self, dir_c: &Vector3<S>) -> Option<Vector2<S>> {
        Self::in_front(dir_c).then(|| dir_c.xy() / dir_c.z)
    }

    fn unproject_dir(&self, n: &Vector2<S>) -> Vector3<S> {
        n.push(S::one())
    }
}
