//! Combined power-law attraction and repulsion.

use super::{Kernel, MAX_KERNEL};
use crate::params::{ParamShape, Parameters};

/// Exponents and flags of a [`PowerLawInteraction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawShape {
    pub p_rep: f64,
    pub p_attr: f64,
    /// When false, negative (attractive) values are floored at zero.
    pub is_attractive: bool,
}

fn raw(s_rep: f64, s_attr: f64, shape: &PowerLawShape, distance: f64) -> f64 {
    s_rep * distance.powf(-shape.p_rep) - s_attr * distance.powf(-shape.p_attr)
}

/// Kernel value for one pair.
///
/// With a cutoff the kernel is shifted by its value at the cutoff and is
/// zero beyond it. The result is capped above at `MAX_KERNEL`.
pub fn power_law_kernel(
    s_rep: f64,
    s_attr: f64,
    cutoff: Option<f64>,
    shape: &PowerLawShape,
    distance: f64,
) -> f64 {
    let mut k = raw(s_rep, s_attr, shape, distance);
    if let Some(cutoff) = cutoff {
        if distance > cutoff {
            return 0.0;
        }
        k -= raw(s_rep, s_attr, shape, cutoff);
    }
    k = k.min(MAX_KERNEL);
    if !shape.is_attractive {
        k = k.max(0.0);
    }
    k
}

/// Per-target parameters: `strength_rep`, `strength_attr`, and `cutoff`
/// when `use_cutoff` is set.
#[derive(Debug, Clone)]
pub struct PowerLawInteraction {
    shape: PowerLawShape,
    use_cutoff: bool,
}

impl PowerLawInteraction {
    pub fn new(shape: PowerLawShape, use_cutoff: bool) -> Self {
        Self { shape, use_cutoff }
    }
}

impl Kernel for PowerLawInteraction {
    fn name(&self) -> &'static str {
        "PowerLawInteraction"
    }

    fn parameter_shapes(&self) -> Vec<(&'static str, ParamShape)> {
        let mut shapes = vec![
            ("strength_rep", ParamShape::Scalar),
            ("strength_attr", ParamShape::Scalar),
        ];
        if self.use_cutoff {
            shapes.push(("cutoff", ParamShape::Scalar));
        }
        shapes
    }

    fn coefficient(&self, params: &Parameters, i: usize, distance: f64) -> f64 {
        let cutoff = if self.use_cutoff {
            Some(params.scalar_or("cutoff", i, f64::INFINITY))
        } else {
            None
        };
        power_law_kernel(
            params.scalar_or("strength_rep", i, 0.0),
            params.scalar_or("strength_attr", i, 0.0),
            cutoff,
            &self.shape,
            distance,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: PowerLawShape = PowerLawShape {
        p_rep: 4.0,
        p_attr: 2.0,
        is_attractive: true,
    };

    #[test]
    fn repulsion_only_is_never_negative() {
        let shape = PowerLawShape {
            is_attractive: false,
            ..SHAPE
        };
        for i in 1..400 {
            let d = i as f64 * 0.05;
            assert!(power_law_kernel(1.0, 2.0, None, &shape, d) >= 0.0);
            assert!(power_law_kernel(1.0, 2.0, Some(5.0), &shape, d) >= 0.0);
        }
    }

    #[test]
    fn attractive_far_away() {
        assert!(power_law_kernel(1.0, 2.0, None, &SHAPE, 3.0) < 0.0);
        assert!(power_law_kernel(1.0, 2.0, None, &SHAPE, 0.2) > 0.0);
    }

    #[test]
    fn vanishes_at_and_beyond_cutoff() {
        assert_eq!(power_law_kernel(1.0, 2.0, Some(3.0), &SHAPE, 3.0), 0.0);
        assert_eq!(power_law_kernel(1.0, 2.0, Some(3.0), &SHAPE, 3.5), 0.0);
    }

    #[test]
    fn capped_above() {
        assert_eq!(power_law_kernel(1.0, 0.0, None, &SHAPE, 1e-6), MAX_KERNEL);
    }
}
