//! High-level entry crate for `camreg`.
//!
//! Registers a second camera (B) against a reference camera (A) from one
//! image pair of a shared planar board, and drives quality-gated intrinsic
//! calibration over image batches.
//!
//! ```no_run
//! use camreg::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let inputs = RegistrationInputs {
//!     image_a: "cam_a.png".into(),
//!     image_b: "cam_b.png".into(),
//!     template: "template.json".into(),
//!     calib_a: "calib_a.json".into(),
//!     calib_b: "calib_b.json".into(),
//! };
//! let registrar = Registrar::with_detector(SidecarDetector, RegistrationConfig::default());
//! let result = registrar.register_files(&inputs)?;
//! println!("B to A: {:?}", result.transform.translation_array());
//! # Ok(())
//! # }
//! ```

/// Core math types, camera models and the solver seams.
pub mod core {
    pub use camreg_core::*;
}

/// Homography, planar pose and PnP solvers.
pub mod linear {
    pub use camreg_linear::*;
}

/// Registration, calibration driver, file I/O and export.
pub mod pipeline {
    pub use camreg_pipeline::*;
}

/// Convenient re-exports for common use cases.
///
/// Import with `use camreg::prelude::*;`.
pub mod prelude {
    pub use crate::core::{
        BoardTemplate, BrownConradyLens, CameraIntrinsics, ImageSize, LensModel,
        MarkerDetections, Pose, PoseSolver, Pt2, Pt3, RigidTransform, Vec3,
    };
    pub use crate::linear::{IterativePnp, PnpOptions};
    pub use crate::pipeline::{
        calibrate_directory, BoardImage, CalibrationConfig, CalibrationError, CameraId,
        IntrinsicsSolver, MarkerDetector, Registrar, RegistrationConfig, RegistrationError,
        RegistrationInputs, RegistrationResult, SidecarDetector,
    };
}
