//! Deterministic pixel noise for synthetic detections.
//!
//! Seeded through splitmix64 so datasets stay identical across platforms.

use crate::{MarkerDetections, Real, Vec2};

/// Uniform per-axis noise in `[-max_abs_px, +max_abs_px]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UniformPixelNoise {
    pub seed: u64,
    pub max_abs_px: Real,
}

impl UniformPixelNoise {
    pub fn new(seed: u64, max_abs_px: Real) -> Self {
        Self { seed, max_abs_px }
    }

    /// Noise vector for a `(image, corner id)` key.
    pub fn sample(&self, image_idx: usize, corner_id: u32) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }
        let key = self.seed
            ^ (image_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (corner_id as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        let u = unit_interval(splitmix64(key));
        let v = unit_interval(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }

    /// Perturb every detected corner of one image.
    pub fn perturb(&self, image_idx: usize, detections: &MarkerDetections) -> MarkerDetections {
        let corners = detections
            .corners
            .iter()
            .zip(&detections.ids)
            .map(|(px, id)| *px + self.sample(image_idx, *id))
            .collect();
        MarkerDetections {
            corners,
            ids: detections.ids.clone(),
        }
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits as a double in `[0, 1)`.
fn unit_interval(x: u64) -> Real {
    (x >> 11) as Real * (1.0 / (1u64 << 53) as Real)
}
