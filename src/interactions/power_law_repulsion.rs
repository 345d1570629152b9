//! Inverse power repulsion that vanishes at the cutoff.

use super::{Kernel, MAX_KERNEL};
use crate::params::{ParamShape, Parameters};

/// `strength · clip(d^-p − cutoff^-p, 0, MAX_KERNEL)`.
pub fn power_law_repulsion_kernel(strength: f64, cutoff: f64, p: f64, distance: f64) -> f64 {
    strength * (distance.powf(-p) - cutoff.powf(-p)).clamp(0.0, MAX_KERNEL)
}

/// Power-law repulsion with exponent `p`.
/// Per-target parameters: `strength`, `cutoff`.
#[derive(Debug, Clone)]
pub struct PowerLawRepulsion {
    p: f64,
}

impl PowerLawRepulsion {
    pub fn new(p: f64) -> Self {
        Self { p }
    }
}

impl Kernel for PowerLawRepulsion {
    fn name(&self) -> &'static str {
        "PowerLawRepulsion"
    }

    fn parameter_shapes(&self) -> Vec<(&'static str, ParamShape)> {
        vec![("strength", ParamShape::Scalar), ("cutoff", ParamShape::Scalar)]
    }

    fn coefficient(&self, params: &Parameters, i: usize, distance: f64) -> f64 {
        power_law_repulsion_kernel(
            params.scalar_or("strength", i, 0.0),
            params.scalar_or("cutoff", i, 0.0),
            self.p,
            distance,
        )
    }
}
