//! Velocity-controlled single integrators.

use ndarray::Array2;

use super::dynamics::{require_matching_dims, Diffusion, Dynamics, StateView};
use crate::error::{ConfigError, SimError};
use crate::params::ParamShape;

const NAME: &str = "SimpleIntegrators";

/// `dx = clip(u + f, -v_max, v_max) dt`, optionally with noise `D`.
#[derive(Debug, Clone)]
pub struct SimpleIntegrators {
    v_max: f64,
    noisy: bool,
}

impl SimpleIntegrators {
    pub fn new(v_max: f64, noisy: bool) -> Self {
        Self {
            v_max: v_max.abs(),
            noisy,
        }
    }
}

impl Default for SimpleIntegrators {
    fn default() -> Self {
        Self::new(f64::INFINITY, false)
    }
}

impl Dynamics for SimpleIntegrators {
    fn name(&self) -> &str {
        NAME
    }

    fn check_dims(&self, state_dim: usize, input_dim: usize) -> Result<(), ConfigError> {
        require_matching_dims(NAME, state_dim, input_dim)
    }

    fn parameter_shapes(&self, state_dim: usize, _input_dim: usize) -> Vec<(&'static str, ParamShape)> {
        if self.noisy {
            vec![("D", ParamShape::Vector(state_dim))]
        } else {
            Vec::new()
        }
    }

    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError> {
        let v_max = self.v_max;
        Ok((&state.u + &state.f).mapv_into(|v| v.clamp(-v_max, v_max)))
    }

    fn diffusion(&self, state: &StateView<'_>) -> Result<Diffusion, SimError> {
        if !self.noisy {
            return Ok(Diffusion::None);
        }
        let d = state.params.require(NAME, "D")?;
        Ok(Diffusion::Diagonal(d.values().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use ndarray::array;

    #[test]
    fn drift_is_saturated() {
        let p = Parameters::new();
        let x = Array2::zeros((2, 2));
        let u = array![[3.0, -0.5], [0.0, -4.0]];
        let f = array![[0.0, 0.0], [1.0, 0.0]];
        let view = StateView {
            x: x.view(),
            u: u.view(),
            u_prev: u.view(),
            f: f.view(),
            params: &p,
        };
        let drift = SimpleIntegrators::new(2.0, false).drift(&view).unwrap();
        assert_eq!(drift, array![[2.0, -0.5], [1.0, -2.0]]);
        assert_eq!(
            SimpleIntegrators::default().diffusion(&view).unwrap(),
            Diffusion::None
        );
    }
}
