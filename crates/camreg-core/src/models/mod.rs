//! Camera model building blocks.
//!
//! The camera pipeline has three stages:
//!
//! 1. `ProjectionModel`: map a 3D ray to normalized coordinates (pinhole).
//! 2. `DistortionModel`: apply lens distortion in normalized space.
//! 3. `IntrinsicsModel`: map normalized coordinates to pixels (K matrix).
//!
//! The combined mapping is `pixel = intrinsics(distortion(projection(dir)))`.
//! [`CameraIntrinsics`] bundles the concrete f64 parameters loaded from a
//! calibration store.

mod calibration;
mod camera;
mod distortion;
mod intrinsics;
mod projection;

pub use calibration::*;
pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;
pub use projection::*;
