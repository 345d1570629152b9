//! Lennard-Jones pair potential.

use super::Kernel;
use crate::params::{ParamShape, Parameters};

/// `24 ε (2 (σ/d)^12 − (σ/d)^6) / d²`.
pub fn lennard_jones_kernel(epsilon: f64, sigma: f64, distance: f64) -> f64 {
    let s6 = (sigma / distance).powi(6);
    24.0 * epsilon * (2.0 * s6 * s6 - s6) / (distance * distance)
}

/// Per-target parameters: `epsilon`, `sigma`. No cutoff.
#[derive(Debug, Clone, Default)]
pub struct LennardJones;

impl Kernel for LennardJones {
    fn name(&self) -> &'static str {
        "LennardJones"
    }

    fn parameter_shapes(&self) -> Vec<(&'static str, ParamShape)> {
        vec![("epsilon", ParamShape::Scalar), ("sigma", ParamShape::Scalar)]
    }

    fn coefficient(&self, params: &Parameters, i: usize, distance: f64) -> f64 {
        lennard_jones_kernel(
            params.scalar_or("epsilon", i, 0.0),
            params.scalar_or("sigma", i, 1.0),
            distance,
        )
    }
}
