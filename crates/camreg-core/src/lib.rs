//! Core math and geometry primitives for `camreg`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt3`, ...) and the
//!   rotation-vector exponential/log maps,
//! - composable camera models (projection + distortion + intrinsics) and the
//!   validated [`CameraIntrinsics`] bundle,
//! - board poses, camera-to-camera [`RigidTransform`]s and the board template,
//! - the [`LensModel`] and [`PoseSolver`] seams used by the registration
//!   pipeline.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ projection(dir)`

/// Camera lens interface and the Brown-Conrady implementation.
pub mod lens;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// PnP solver interface.
pub mod solver;
/// Deterministic synthetic scenes for tests.
pub mod synthetic;
mod types;

pub use lens::*;
pub use math::*;
pub use models::*;
pub use solver::*;
pub use types::*;
