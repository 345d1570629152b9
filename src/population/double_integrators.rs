//! Damped double integrators (inertial agents).

use ndarray::{s, Array2, Zip};

use super::dynamics::{Diffusion, Dynamics, StateView};
use crate::error::{ConfigError, SimError};
use crate::params::ParamShape;

const NAME: &str = "DampedDoubleIntegrators";

/// State is `[position, velocity]`, each `input_dim` wide.
///
/// `d position = velocity dt`,
/// `d velocity = (-damping velocity + u + f) dt + D dW`.
#[derive(Debug, Clone, Default)]
pub struct DampedDoubleIntegrators;

impl Dynamics for DampedDoubleIntegrators {
    fn name(&self) -> &str {
        NAME
    }

    fn check_dims(&self, state_dim: usize, input_dim: usize) -> Result<(), ConfigError> {
        if state_dim != 2 * input_dim {
            return Err(ConfigError::InvalidValue {
                name: "state_dim".to_string(),
                reason: format!(
                    "{} needs state_dim == 2 * input_dim, got {} and {}",
                    NAME, state_dim, input_dim
                ),
            });
        }
        Ok(())
    }

    fn parameter_shapes(&self, _state_dim: usize, _input_dim: usize) -> Vec<(&'static str, ParamShape)> {
        vec![("damping", ParamShape::Scalar), ("D", ParamShape::Scalar)]
    }

    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError> {
        let damping = state.params.require(NAME, "damping")?;
        let m = state.u.ncols();
        let velocity = state.x.slice(s![.., m..2 * m]);

        let mut drift = Array2::<f64>::zeros(state.x.raw_dim());
        drift.slice_mut(s![.., ..m]).assign(&velocity);
        let mut acceleration = drift.slice_mut(s![.., m..2 * m]);
        for (i, mut row) in acceleration.rows_mut().into_iter().enumerate() {
            let c = damping.scalar(i);
            Zip::from(&mut row)
                .and(velocity.row(i))
                .and(state.u.row(i))
                .and(state.f.row(i))
                .for_each(|a, &v, &u, &f| *a = -c * v + u + f);
        }
        Ok(drift)
    }

    fn diffusion(&self, state: &StateView<'_>) -> Result<Diffusion, SimError> {
        let d = state.params.require(NAME, "D")?;
        let m = state.u.ncols();
        let amplitude = Array2::from_shape_fn(state.x.raw_dim(), |(i, k)| {
            if k < m {
                0.0
            } else {
                d.scalar(i)
            }
        });
        Ok(Diffusion::Diagonal(amplitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSpec;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn velocity_feeds_position_and_is_damped() {
        let model = DampedDoubleIntegrators;
        let p = ParameterSpec::constants([("damping", 0.5), ("D", 0.2)])
            .resolve(NAME, &model.parameter_shapes(4, 2), 1, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let x = array![[10.0, 10.0, 2.0, -4.0]];
        let u = array![[1.0, 0.0]];
        let f = array![[0.0, 1.0]];
        let view = StateView {
            x: x.view(),
            u: u.view(),
            u_prev: u.view(),
            f: f.view(),
            params: &p,
        };
        assert_eq!(model.drift(&view).unwrap(), array![[2.0, -4.0, 0.0, 3.0]]);
        assert_eq!(
            model.diffusion(&view).unwrap(),
            Diffusion::Diagonal(array![[0.0, 0.0, 0.2, 0.2]])
        );
    }

    #[test]
    fn rejects_odd_state() {
        assert!(DampedDoubleIntegrators.check_dims(3, 2).is_err());
        assert!(DampedDoubleIntegrators.check_dims(4, 2).is_ok());
    }
}
