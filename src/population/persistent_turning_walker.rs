//! Light-sensitive persistent turning walkers.
//!
//! State per agent is `[x, y, v, θ, ω]`: planar position, speed, heading
//! and angular rate. Speed and angular rate relax towards preferred values
//! and respond to a scalar stimulus `u[:, 0]` and to its rate of change,
//! split into rising (`du⁺ ≥ 0`) and falling (`du⁻ ≤ 0`) parts:
//!
//! ```text
//! dx = v cos θ dt
//! dy = v sin θ dt
//! dv = (θs (μs − v) + αs u + βs du⁺ + γs du⁻) dt + σs dW
//! dθ = ω dt
//! dω = (θw (μw − ω) + sign(ω) (αw u + βw du⁺ + γw du⁻)) dt + σw dW
//! ```
//!
//! The stimulus derivative is `(u − u_prev) / dt` taken across all input
//! columns. External forces are ignored.

use std::f64::consts::TAU;

use ndarray::{Array2, ArrayViewMut2, Axis, Zip};

use super::dynamics::{Diffusion, Dynamics, StateView};
use crate::error::{ConfigError, SimError};
use crate::params::ParamShape;

const NAME: &str = "PersistentTurningWalker";

const STATE_DIM: usize = 5;
const SPEED: usize = 2;
const HEADING: usize = 3;
const TURN_RATE: usize = 4;

const PARAMETERS: [&str; 12] = [
    "theta_s", "mu_s", "alpha_s", "beta_s", "gamma_s", "sigma_s", "theta_w", "mu_w", "alpha_w",
    "beta_w", "gamma_w", "sigma_w",
];

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Persistent turning walker driven by a light stimulus.
#[derive(Debug, Clone)]
pub struct PersistentTurningWalker {
    /// Interval over which the stimulus derivative is taken.
    dt: f64,
}

impl PersistentTurningWalker {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

impl Dynamics for PersistentTurningWalker {
    fn name(&self) -> &str {
        NAME
    }

    fn check_dims(&self, state_dim: usize, input_dim: usize) -> Result<(), ConfigError> {
        if state_dim != STATE_DIM || input_dim == 0 {
            return Err(ConfigError::InvalidValue {
                name: "state_dim".to_string(),
                reason: format!(
                    "{} needs state_dim == 5 and input_dim >= 1, got {} and {}",
                    NAME, state_dim, input_dim
                ),
            });
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::InvalidValue {
                name: "dt".to_string(),
                reason: format!("stimulus interval must be positive, got {}", self.dt),
            });
        }
        Ok(())
    }

    fn parameter_shapes(&self, _state_dim: usize, _input_dim: usize) -> Vec<(&'static str, ParamShape)> {
        PARAMETERS.iter().map(|name| (*name, ParamShape::Scalar)).collect()
    }

    fn drift(&self, state: &StateView<'_>) -> Result<Array2<f64>, SimError> {
        let p = |name: &str| state.params.require(NAME, name);
        let (theta_s, mu_s, alpha_s, beta_s, gamma_s) =
            (p("theta_s")?, p("mu_s")?, p("alpha_s")?, p("beta_s")?, p("gamma_s")?);
        let (theta_w, mu_w, alpha_w, beta_w, gamma_w) =
            (p("theta_w")?, p("mu_w")?, p("alpha_w")?, p("beta_w")?, p("gamma_w")?);

        let mut drift = Array2::<f64>::zeros(state.x.raw_dim());
        let rates = Zip::from(&state.u).and(&state.u_prev).map_collect(|u, prev| (u - prev) / self.dt);

        for (i, (x, mut out)) in state
            .x
            .axis_iter(Axis(0))
            .zip(drift.axis_iter_mut(Axis(0)))
            .enumerate()
        {
            let (v, heading, w) = (x[SPEED], x[HEADING], x[TURN_RATE]);
            let stimulus = state.u[[i, 0]];
            let rising = rates.row(i).iter().fold(0.0_f64, |acc, r| acc.max(*r));
            let falling = rates.row(i).iter().fold(0.0_f64, |acc, r| acc.min(*r));

            out[0] = v * heading.cos();
            out[1] = v * heading.sin();
            out[SPEED] = theta_s.scalar(i) * (mu_s.scalar(i) - v)
                + alpha_s.scalar(i) * stimulus
                + beta_s.scalar(i) * rising
                + gamma_s.scalar(i) * falling;
            out[HEADING] = w;
            out[TURN_RATE] = theta_w.scalar(i) * (mu_w.scalar(i) - w)
                + sign(w)
                    * (alpha_w.scalar(i) * stimulus
                        + beta_w.scalar(i) * rising
                        + gamma_w.scalar(i) * falling);
        }
        Ok(drift)
    }

    fn diffusion(&self, state: &StateView<'_>) -> Result<Diffusion, SimError> {
        let sigma_s = state.params.require(NAME, "sigma_s")?;
        let sigma_w = state.params.require(NAME, "sigma_w")?;
        let amplitude = Array2::from_shape_fn(state.x.raw_dim(), |(i, k)| match k {
            SPEED => sigma_s.scalar(i),
            TURN_RATE => sigma_w.scalar(i),
            _ => 0.0,
        });
        Ok(Diffusion::Diagonal(amplitude))
    }

    fn normalize_state(&self, mut x: ArrayViewMut2<'_, f64>) {
        x.column_mut(HEADING).mapv_inplace(|h| h.rem_euclid(TAU));
    }
}
