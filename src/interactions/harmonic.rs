//! Linear spring repulsion with a hard cutoff.

use super::Kernel;
use crate::params::{ParamShape, Parameters};

/// Repulsion magnitude `strength · (cutoff − d)` inside `cutoff`, zero outside.
pub fn harmonic_magnitude(strength: f64, cutoff: f64, distance: f64) -> f64 {
    if distance < cutoff {
        strength * (cutoff - distance)
    } else {
        0.0
    }
}

/// Harmonic repulsion. Per-target parameters: `strength`, `cutoff`.
///
/// The magnitude acts along the unit vector from source to target.
#[derive(Debug, Clone, Default)]
pub struct HarmonicRepulsion;

impl Kernel for HarmonicRepulsion {
    fn name(&self) -> &'static str {
        "HarmonicRepulsion"
    }

    fn parameter_shapes(&self) -> Vec<(&'static str, ParamShape)> {
        vec![("strength", ParamShape::Scalar), ("cutoff", ParamShape::Scalar)]
    }

    fn coefficient(&self, params: &Parameters, i: usize, distance: f64) -> f64 {
        let strength = params.scalar_or("strength", i, 0.0);
        let cutoff = params.scalar_or("cutoff", i, 0.0);
        harmonic_magnitude(strength, cutoff, distance) / distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_and_beyond_cutoff() {
        for &(s, c) in &[(1.0, 10.0), (0.3, 2.5), (7.0, 0.1)] {
            assert_eq!(harmonic_magnitude(s, c, c), 0.0);
            assert_eq!(harmonic_magnitude(s, c, c * 1.5), 0.0);
            assert_eq!(harmonic_magnitude(s, c, c + 1e3), 0.0);
        }
    }

    #[test]
    fn positive_inside_cutoff() {
        for &(s, c) in &[(1.0, 10.0), (0.3, 2.5), (7.0, 0.1)] {
            for frac in [0.0, 0.1, 0.5, 0.999] {
                assert!(harmonic_magnitude(s, c, c * frac) > 0.0);
            }
        }
        assert_eq!(harmonic_magnitude(1.0, 10.0, 5.0), 5.0);
    }
}
