//! Deterministic synthetic boards, poses and detections.
//!
//! Used by tests across the workspace to build registration scenes with a
//! known ground truth.
//!
//! ```
//! use camreg_core::synthetic::planar;
//!
//! let scene = planar::stereo_scene().unwrap();
//! let det = scene.detections_a();
//! assert_eq!(det.len(), scene.board.corner_count());
//! ```

pub mod noise;
pub mod planar;
