//! Acceptance policy for intrinsic calibration runs.

use std::collections::BTreeSet;

use camreg_core::Real;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// A view is good when its RMS is at or below this value (pixels).
    pub per_view_threshold: Real,
    pub min_good_images: usize,
    /// The run is accepted when its overall RMS is strictly below this value.
    pub overall_rms_threshold: Real,
}

/// Outcome of an intrinsics solve as seen by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRun {
    pub per_view_errors: Vec<Real>,
    pub overall_rms: Real,
    pub num_good_images: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateRejection {
    TooFewGoodImages { found: usize, required: usize },
    RmsTooHigh { rms: Real, threshold: Real },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub accepted: bool,
    pub good_indices: BTreeSet<usize>,
    /// Ascending indices of views above the per-view threshold.
    pub failing_indices: Vec<usize>,
    pub rejection: Option<GateRejection>,
}

impl GateDecision {
    pub fn num_good(&self) -> usize {
        self.good_indices.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    pub thresholds: QualityThresholds,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn evaluate(&self, per_view_errors: &[Real], overall_rms: Real) -> GateDecision {
        let t = &self.thresholds;
        let mut good_indices = BTreeSet::new();
        let mut failing_indices = Vec::new();
        for (idx, err) in per_view_errors.iter().enumerate() {
            if *err <= t.per_view_threshold {
                good_indices.insert(idx);
            } else {
                failing_indices.push(idx);
            }
        }

        for idx in &failing_indices {
            warn!(
                "view {idx} exceeds the per-view threshold: {:.4} > {}",
                per_view_errors[*idx], t.per_view_threshold
            );
        }

        let rejection = if good_indices.len() < t.min_good_images {
            Some(GateRejection::TooFewGoodImages {
                found: good_indices.len(),
                required: t.min_good_images,
            })
        } else if !(overall_rms < t.overall_rms_threshold) {
            Some(GateRejection::RmsTooHigh {
                rms: overall_rms,
                threshold: t.overall_rms_threshold,
            })
        } else {
            None
        };

        GateDecision {
            accepted: rejection.is_none(),
            good_indices,
            failing_indices,
            rejection,
        }
    }

    pub fn evaluate_run(&self, run: &CalibrationRun) -> GateDecision {
        self.evaluate(&run.per_view_errors, run.overall_rms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(min_good: usize) -> QualityGate {
        QualityGate::new(QualityThresholds {
            per_view_threshold: 1.0,
            min_good_images: min_good,
            overall_rms_threshold: 1.0,
        })
    }

    #[test]
    fn accepts_when_enough_views_are_good() {
        let d = gate(2).evaluate(&[0.5, 0.5, 2.0], 0.6);
        assert!(d.accepted);
        assert_eq!(d.good_indices, BTreeSet::from([0, 1]));
        assert_eq!(d.failing_indices, vec![2]);
        assert_eq!(d.rejection, None);
    }

    #[test]
    fn rejects_below_minimum_good_views() {
        let d = gate(3).evaluate(&[0.5, 0.5, 2.0], 0.6);
        assert!(!d.accepted);
        assert_eq!(d.failing_indices, vec![2]);
        assert_eq!(
            d.rejection,
            Some(GateRejection::TooFewGoodImages {
                found: 2,
                required: 3
            })
        );
    }

    #[test]
    fn threshold_boundaries() {
        // A view exactly at the threshold is good.
        let d = gate(1).evaluate(&[1.0], 0.5);
        assert!(d.accepted);
        // An overall RMS exactly at the threshold is rejected.
        let d = gate(1).evaluate(&[0.2], 1.0);
        assert!(!d.accepted);
        assert!(matches!(d.rejection, Some(GateRejection::RmsTooHigh { .. })));
        assert!(!gate(1).evaluate(&[0.2], Real::NAN).accepted);
    }

    #[test]
    fn failing_views_are_reported_even_when_accepted() {
        let run = CalibrationRun {
            per_view_errors: vec![3.0, 0.1, 0.2, 1.5, 0.3],
            overall_rms: 0.4,
            num_good_images: 3,
        };
        let d = gate(3).evaluate_run(&run);
        assert!(d.accepted);
        assert_eq!(d.num_good(), run.num_good_images);
        assert_eq!(d.failing_indices, vec![0, 3]);
    }
}
