//! Linear initialisation and pose solvers for `camreg`.
//!
//! - normalized homography DLT and planar pose recovery,
//! - non-planar PnP DLT,
//! - [`IterativePnp`], the [`camreg_core::PoseSolver`] used for board pose
//!   estimation.

pub mod math;

mod homography;
mod planar_pose;
mod pnp;

pub use homography::*;
pub use planar_pose::*;
pub use pnp::*;
